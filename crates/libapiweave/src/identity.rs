//! Stable, platform-independent declaration identities.

use std::{fmt, str::FromStr};

use serde::{Serialize, Serializer};

use crate::error::ApiweaveError;

/// Uniquely identifies a documented declaration across every platform pass.
///
/// An identity is a fully-qualified dotted path (`javadoc.Test.test2`) plus, for callables, the
/// ordered list of parameter type ids that disambiguates overloads. The text form appends the
/// signature in parentheses: `javadoc.Test.test2(kotlin.String)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclarationId {
    /// Dotted fully-qualified path.
    path: String,
    /// Parameter type ids, present only for callables.
    signature: Option<Vec<String>>,
}

impl DeclarationId {
    /// Identity for a non-callable declaration (package, class, property).
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            signature: None,
        }
    }

    /// Identity for a callable with the given parameter type ids, in declaration order.
    pub fn callable<I, S>(path: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into(),
            signature: Some(params.into_iter().map(Into::into).collect()),
        }
    }

    /// The dotted path without signature.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The parameter type ids, if this identity denotes a callable.
    pub fn signature(&self) -> Option<&[String]> {
        self.signature.as_deref()
    }

    /// Whether this identity denotes a callable.
    pub fn is_callable(&self) -> bool {
        self.signature.is_some()
    }

    /// The simple (last) name segment.
    pub fn name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }

    /// Path segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('.').filter(|s| !s.is_empty())
    }

    /// Identity of the enclosing declaration, if any.
    pub fn parent(&self) -> Option<Self> {
        self.path
            .rsplit_once('.')
            .map(|(parent, _)| Self::new(parent))
    }

    /// Identity of a non-callable child of this declaration.
    pub fn child(&self, name: &str) -> Self {
        if self.path.is_empty() {
            Self::new(name)
        } else {
            Self::new(format!("{}.{name}", self.path))
        }
    }

    /// Identity of a callable child of this declaration.
    pub fn callable_child<I, S>(&self, name: &str, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let base = self.child(name);
        Self::callable(base.path, params)
    }

    /// This identity nested under `prefix`, keeping its signature.
    pub fn qualified(&self, prefix: &str) -> Self {
        if prefix.is_empty() {
            return self.clone();
        }
        Self {
            path: format!("{prefix}.{}", self.path),
            signature: self.signature.clone(),
        }
    }

    /// Dotted prefixes of the path, longest first, excluding the full path itself.
    ///
    /// `java.util.Map.Entry` yields `java.util.Map`, `java.util`, `java`.
    pub fn enclosing_prefixes(&self) -> impl Iterator<Item = &str> {
        let path = self.path.as_str();
        path.char_indices()
            .rev()
            .filter(|(_, c)| *c == '.')
            .map(move |(idx, _)| &path[..idx])
    }
}

impl fmt::Display for DeclarationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if let Some(params) = &self.signature {
            write!(f, "({})", params.join(","))?;
        }
        Ok(())
    }
}

impl FromStr for DeclarationId {
    type Err = ApiweaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some(open) = s.find('(') else {
            if s.is_empty() {
                return Err(ApiweaveError::config("empty declaration identity"));
            }
            return Ok(Self::new(s));
        };
        let Some(inner) = s[open + 1..].strip_suffix(')') else {
            return Err(ApiweaveError::config(format!(
                "unterminated signature in identity '{s}'"
            )));
        };
        let params = inner
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        Ok(Self::callable(&s[..open], params))
    }
}

impl Serialize for DeclarationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_and_display_roundtrip_callables() {
        let id: DeclarationId = "javadoc.Test.test2(kotlin.String)".parse().unwrap();
        assert_eq!(id.path(), "javadoc.Test.test2");
        assert_eq!(id.signature(), Some(&["kotlin.String".to_string()][..]));
        assert_eq!(id.to_string(), "javadoc.Test.test2(kotlin.String)");

        let no_args: DeclarationId = "javadoc.Test.test()".parse().unwrap();
        assert_eq!(no_args.signature(), Some(&[][..]));
        assert!(no_args.is_callable());
        assert_ne!(no_args, DeclarationId::new("javadoc.Test.test"));
    }

    #[test]
    fn rejects_malformed_identities() {
        assert!("".parse::<DeclarationId>().is_err());
        assert!("a.b(c".parse::<DeclarationId>().is_err());
    }

    #[test]
    fn navigation_helpers() {
        let id = DeclarationId::new("java.util.Map.Entry");
        assert_eq!(id.name(), "Entry");
        assert_eq!(id.parent(), Some(DeclarationId::new("java.util.Map")));
        assert_eq!(
            id.enclosing_prefixes().collect::<Vec<_>>(),
            vec!["java.util.Map", "java.util", "java"]
        );
        assert_eq!(
            DeclarationId::new("pkg").callable_child("f", ["T"]).to_string(),
            "pkg.f(T)"
        );
        assert_eq!(DeclarationId::new("").child("root").path(), "root");
        assert_eq!(
            DeclarationId::callable("A.f", ["T"]).qualified("p").to_string(),
            "p.A.f(T)"
        );
    }
}
