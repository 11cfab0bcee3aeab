use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A hierarchical event address such as `/robot/arm/`.
///
/// Scopes are lists of components. The canonical string form starts and ends
/// with `/`; the root scope is `/`. Components consist of ASCII letters,
/// digits, `_` and `-`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope {
    components: Vec<String>,
}

impl Scope {
    /// Parses `scope`.
    ///
    /// The trailing slash is optional.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidScope`] if the string is not a valid scope.
    pub fn new(scope: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidScope {
            scope: scope.to_string(),
            reason,
        };

        let rest = scope
            .strip_prefix('/')
            .ok_or_else(|| invalid("must start with `/`"))?;
        if rest.is_empty() {
            return Ok(Self::root());
        }

        let rest = rest.strip_suffix('/').unwrap_or(rest);
        let components = rest
            .split('/')
            .map(|component| {
                validate_component(component).map_err(invalid)?;
                Ok(component.to_string())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { components })
    }

    /// The root scope `/`.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// The components of this scope, outermost first.
    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Whether this is the root scope.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Appends the components of `child`.
    #[must_use]
    pub fn concat(&self, child: &Self) -> Self {
        let mut components = self.components.clone();
        components.extend(child.components.iter().cloned());
        Self { components }
    }

    /// Appends a single component.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidScope`] if `component` is not a valid scope
    /// component.
    pub fn child(&self, component: &str) -> Result<Self> {
        validate_component(component).map_err(|reason| Error::InvalidScope {
            scope: format!("{self}{component}/"),
            reason,
        })?;

        let mut components = self.components.clone();
        components.push(component.to_string());
        Ok(Self { components })
    }

    /// Whether `self` lies strictly below `other`.
    #[must_use]
    pub fn is_sub_scope_of(&self, other: &Self) -> bool {
        self.components.len() > other.components.len()
            && self.components.starts_with(&other.components)
    }

    /// Whether `self` lies strictly above `other`.
    #[must_use]
    pub fn is_super_scope_of(&self, other: &Self) -> bool {
        other.is_sub_scope_of(self)
    }

    /// Whether `self` equals `other` or lies below it.
    #[must_use]
    pub fn is_covered_by(&self, other: &Self) -> bool {
        self.components.starts_with(&other.components)
    }

    /// All scopes above this one, root first, optionally followed by `self`.
    #[must_use]
    pub fn super_scopes(&self, include_self: bool) -> Vec<Self> {
        let end = if include_self {
            self.components.len()
        } else {
            self.components.len().saturating_sub(1)
        };

        if self.is_root() && !include_self {
            return Vec::new();
        }

        (0..=end)
            .map(|length| Self {
                components: self.components[..length].to_vec(),
            })
            .collect()
    }
}

fn validate_component(component: &str) -> std::result::Result<(), &'static str> {
    if component.is_empty() {
        return Err("empty component");
    }
    if !component
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err("components may only contain ascii letters, digits, `_` and `-`");
    }
    Ok(())
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for Scope {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("/")?;
        for component in &self.components {
            write!(f, "{component}/")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let scope = Scope::new("/robot/arm").unwrap();

        assert_eq!(scope.components(), ["robot", "arm"]);
        assert_eq!(scope.to_string(), "/robot/arm/");
        assert_eq!(Scope::new("/robot/arm/").unwrap(), scope);
        assert!(Scope::new("/").unwrap().is_root());
    }

    #[test]
    fn test_invalid() {
        for invalid in ["", "robot", "//", "/robot//arm/", "/ro bot/", "/größe/"] {
            assert!(
                matches!(Scope::new(invalid), Err(Error::InvalidScope { .. })),
                "{invalid:?}"
            );
        }
    }

    #[test]
    fn test_relations() {
        let root = Scope::root();
        let robot = Scope::new("/robot").unwrap();
        let arm = robot.child("arm").unwrap();

        assert!(arm.is_sub_scope_of(&robot));
        assert!(arm.is_sub_scope_of(&root));
        assert!(!robot.is_sub_scope_of(&robot));
        assert!(robot.is_super_scope_of(&arm));
        assert!(robot.is_covered_by(&robot));
        assert!(!robot.is_covered_by(&arm));
        assert!(!Scope::new("/robotic").unwrap().is_covered_by(&robot));
    }

    #[test]
    fn test_concat_and_super_scopes() {
        let scope = Scope::new("/a").unwrap().concat(&Scope::new("/b/c/").unwrap());

        assert_eq!(scope.to_string(), "/a/b/c/");
        assert_eq!(
            scope
                .super_scopes(false)
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            ["/", "/a/", "/a/b/"]
        );
        assert_eq!(scope.super_scopes(true).len(), 4);
        assert!(Scope::root().super_scopes(false).is_empty());
        assert_eq!(Scope::root().super_scopes(true), [Scope::root()]);
    }

    #[test]
    fn test_child_rejects_invalid_component() {
        assert!(Scope::root().child("a/b").is_err());
        assert!(Scope::root().child("").is_err());
    }
}
