// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt::Display;

use crate::PolicyDeclaration;

/// One interception point: a method invoked on a type, with the declarations that can govern it.
///
/// Call sites are computed by a [`Catalog`][crate::Catalog] for every type and every method
/// visible on it, walking the type's ancestors. They never change once computed.
///
/// The three declaration slots are looked up as follows:
///
/// - the **own** declaration comes from the most specific definition of the method, starting at
///   the invoked type, if that definition carries a retry marker;
/// - the call site is **suppressed** if that most specific definition carries the fault-tolerance
///   marker group without a retry marker;
/// - the **enclosing type** declaration comes from the most specific type, starting at the invoked
///   type, that carries a retry marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    type_name: Cow<'static, str>,
    method: Cow<'static, str>,
    own_declaration: Option<PolicyDeclaration>,
    suppressed: bool,
    enclosing_type_declaration: Option<PolicyDeclaration>,
}

/// Which declaration level governs a call site.
///
/// Exactly one level is selected; levels are never merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// The most specific definition of the method carries its own retry marker.
    Own(&'a PolicyDeclaration),

    /// The most specific definition of the method switches retry off.
    Suppressed,

    /// The nearest type-level retry marker applies.
    Inherited(&'a PolicyDeclaration),

    /// Nothing in the hierarchy declares retry.
    Undeclared,
}

impl CallSite {
    pub(crate) fn new(
        type_name: Cow<'static, str>,
        method: Cow<'static, str>,
        own_declaration: Option<PolicyDeclaration>,
        suppressed: bool,
        enclosing_type_declaration: Option<PolicyDeclaration>,
    ) -> Self {
        Self {
            type_name,
            method,
            own_declaration,
            suppressed,
            enclosing_type_declaration,
        }
    }

    /// Returns the name of the invoked type.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the name of the invoked method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the method-scoped declaration of the most specific definition of the method.
    #[must_use]
    pub fn own_declaration(&self) -> Option<&PolicyDeclaration> {
        self.own_declaration.as_ref()
    }

    /// Returns `true` if the most specific definition of the method switches retry off.
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Returns the type-scoped declaration of the most specific type that carries one.
    #[must_use]
    pub fn enclosing_type_declaration(&self) -> Option<&PolicyDeclaration> {
        self.enclosing_type_declaration.as_ref()
    }

    /// Returns the declaration level that governs this call site.
    ///
    /// The own method declaration wins over suppression, which wins over the enclosing type
    /// declaration.
    #[must_use]
    pub fn resolution(&self) -> Resolution<'_> {
        if let Some(own) = &self.own_declaration {
            return Resolution::Own(own);
        }

        if self.suppressed {
            return Resolution::Suppressed;
        }

        match &self.enclosing_type_declaration {
            Some(enclosing) => Resolution::Inherited(enclosing),
            None => Resolution::Undeclared,
        }
    }
}

impl Display for CallSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.type_name, self.method)
    }
}
