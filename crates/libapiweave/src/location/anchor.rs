//! In-page anchors for embedded declarations.
//!
//! Callables encode as `<name>-<p1>-<p2>-...-` over their parameter type ids, so a no-argument
//! function `test()` becomes `test--` and `test2(kotlin.String)` becomes `test2-kotlin.String-`.
//! Generic parameters encode as their name. Non-callables encode as their bare name.
//!
//! `-` and `%` are percent-escaped inside names and type ids, which keeps every callable anchor
//! distinct from every other anchor: raw `-` only ever appears as a separator.

use crate::identity::DeclarationId;

/// Anchor for a declaration embedded in a page.
pub fn anchor_for(id: &DeclarationId) -> String {
    let mut out = escape(id.name());
    if let Some(params) = id.signature() {
        out.push('-');
        let encoded: Vec<String> = params.iter().map(|p| escape_type(p)).collect();
        out.push_str(&encoded.join("-"));
        out.push('-');
    }
    out
}

/// Escape a type id. An empty id encodes as a lone `%`, which no escaped text can produce.
fn escape_type(type_id: &str) -> String {
    if type_id.is_empty() {
        "%".to_string()
    } else {
        escape(type_id)
    }
}

/// Percent-escape separator and fragment-unsafe characters.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '-' | '%' | '#' | '"' | '<' | '>' | '&' | ' ' => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    out.push_str(&format!("%{byte:02X}"));
                }
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn callable_anchors() {
        assert_eq!(anchor_for(&DeclarationId::callable("javadoc.Test.test", Vec::<String>::new())), "test--");
        assert_eq!(
            anchor_for(&DeclarationId::callable("javadoc.Test.test2", ["kotlin.String"])),
            "test2-kotlin.String-"
        );
        assert_eq!(anchor_for(&DeclarationId::callable("javadoc.Test.test3", ["T"])), "test3-T-");
        assert_eq!(anchor_for(&DeclarationId::new("javadoc.Test.size")), "size");
    }

    #[test]
    fn overloads_never_collide() {
        let ids = vec![
            DeclarationId::callable("p.C.f", Vec::<String>::new()),
            DeclarationId::callable("p.C.f", [""]),
            DeclarationId::callable("p.C.f", ["a"]),
            DeclarationId::callable("p.C.f", ["a", "b"]),
            DeclarationId::callable("p.C.f", ["a-b"]),
            DeclarationId::callable("p.C.f", ["a%2Db"]),
            DeclarationId::callable("p.C.f", ["a", ""]),
            DeclarationId::callable("p.C.f", ["", "a"]),
            DeclarationId::callable("p.C.f-a", Vec::<String>::new()),
            DeclarationId::new("p.C.f"),
            DeclarationId::new("p.C.f--"),
        ];
        let anchors: HashSet<String> = ids.iter().map(anchor_for).collect();
        assert_eq!(anchors.len(), ids.len());
    }
}
