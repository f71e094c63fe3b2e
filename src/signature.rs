//! Type signature encoding shared by source and binary members.
//!
//! Source members carry unresolved signatures (`QString;`, `[I`), binary
//! members carry resolved ones taken from class-file descriptors with `/`
//! replaced by `.` (`Ljava.lang.String;`). Both forms render back to the
//! readable names used in element labels.

pub fn create_type_signature(type_name: &str) -> String {
    let mut name = type_name.trim();
    let mut dims = 0usize;
    if let Some(stripped) = name.strip_suffix("...") {
        name = stripped.trim_end();
        dims += 1;
    }
    while let Some(stripped) = name.strip_suffix("[]") {
        name = stripped.trim_end();
        dims += 1;
    }

    let mut sig = "[".repeat(dims);
    match primitive_code(name) {
        Some(code) => sig.push(code),
        None => {
            sig.push('Q');
            match name.find('<') {
                Some(lt) if name.ends_with('>') => {
                    sig.push_str(name[..lt].trim());
                    sig.push('<');
                    for arg in split_type_arguments(&name[lt + 1..name.len() - 1]) {
                        let arg = arg.trim();
                        if arg == "?" {
                            sig.push('*');
                        } else if let Some(bound) = arg.strip_prefix("? extends ") {
                            sig.push('+');
                            sig.push_str(&create_type_signature(bound));
                        } else if let Some(bound) = arg.strip_prefix("? super ") {
                            sig.push('-');
                            sig.push_str(&create_type_signature(bound));
                        } else {
                            sig.push_str(&create_type_signature(arg));
                        }
                    }
                    sig.push('>');
                }
                _ => sig.push_str(name),
            }
            sig.push(';');
        }
    }
    sig
}

/// Splits a method descriptor such as `(I[Ljava/lang/String;)V` into
/// dotted parameter signatures and a return signature.
pub fn parse_method_descriptor(descriptor: &str) -> Option<(Vec<String>, String)> {
    let rest = descriptor.strip_prefix('(')?;
    let close = rest.find(')')?;
    let params_part = &rest[..close];
    let return_part = &rest[close + 1..];

    let mut params = Vec::new();
    let mut remaining = params_part;
    while !remaining.is_empty() {
        let len = field_descriptor_len(remaining)?;
        params.push(remaining[..len].replace('/', "."));
        remaining = &remaining[len..];
    }

    if return_part.is_empty() || field_descriptor_len(return_part) != Some(return_part.len()) {
        return None;
    }
    Some((params, return_part.replace('/', ".")))
}

pub fn field_descriptor_to_signature(descriptor: &str) -> String {
    descriptor.replace('/', ".")
}

fn field_descriptor_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while bytes.get(i) == Some(&b'[') {
        i += 1;
    }
    match bytes.get(i)? {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b'V' => Some(i + 1),
        b'L' => {
            let end = s[i..].find(';')?;
            Some(i + end + 1)
        }
        _ => None,
    }
}

/// Readable form of a signature: `[I` becomes `int[]`, `Ljava.util.List;`
/// becomes `List` (`qualified == false`) or `java.util.List`.
pub fn to_readable(signature: &str, qualified: bool) -> String {
    let mut dims = 0usize;
    let mut sig = signature;
    while let Some(stripped) = sig.strip_prefix('[') {
        dims += 1;
        sig = stripped;
    }

    let base = match sig.chars().next() {
        Some('B') if sig.len() == 1 => "byte".to_string(),
        Some('C') if sig.len() == 1 => "char".to_string(),
        Some('D') if sig.len() == 1 => "double".to_string(),
        Some('F') if sig.len() == 1 => "float".to_string(),
        Some('I') if sig.len() == 1 => "int".to_string(),
        Some('J') if sig.len() == 1 => "long".to_string(),
        Some('S') if sig.len() == 1 => "short".to_string(),
        Some('Z') if sig.len() == 1 => "boolean".to_string(),
        Some('V') if sig.len() == 1 => "void".to_string(),
        Some('L') | Some('Q') => {
            let body = sig[1..].strip_suffix(';').unwrap_or(&sig[1..]);
            let (raw, args) = match body.find('<') {
                Some(lt) => (&body[..lt], Some(&body[lt..])),
                None => (body, None),
            };
            let raw = raw.replace('/', ".");
            let mut name = if qualified {
                raw
            } else {
                raw.rsplit('.').next().unwrap_or(&raw).to_string()
            };
            if let Some(args) = args {
                name.push_str(&readable_type_arguments(args, qualified));
            }
            name
        }
        _ => sig.to_string(),
    };

    let mut out = base;
    for _ in 0..dims {
        out.push_str("[]");
    }
    out
}

fn readable_type_arguments(args: &str, qualified: bool) -> String {
    let inner = args
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(args);
    let mut parts = Vec::new();
    let mut remaining = inner;
    while !remaining.is_empty() {
        let (prefix, rest) = match remaining.as_bytes()[0] {
            b'*' => {
                parts.push("?".to_string());
                remaining = &remaining[1..];
                continue;
            }
            b'+' => ("? extends ", &remaining[1..]),
            b'-' => ("? super ", &remaining[1..]),
            _ => ("", remaining),
        };
        let len = signature_len(rest).unwrap_or(rest.len());
        parts.push(format!("{prefix}{}", to_readable(&rest[..len], qualified)));
        remaining = &rest[len..];
    }
    format!("<{}>", parts.join(", "))
}

fn signature_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while bytes.get(i) == Some(&b'[') {
        i += 1;
    }
    match bytes.get(i)? {
        b'L' | b'Q' => {
            let mut depth = 0usize;
            for (offset, b) in bytes[i..].iter().enumerate() {
                match b {
                    b'<' => depth += 1,
                    b'>' => depth = depth.saturating_sub(1),
                    b';' if depth == 0 => return Some(i + offset + 1),
                    _ => {}
                }
            }
            None
        }
        _ => Some(i + 1),
    }
}

fn primitive_code(name: &str) -> Option<char> {
    Some(match name {
        "byte" => 'B',
        "char" => 'C',
        "double" => 'D',
        "float" => 'F',
        "int" => 'I',
        "long" => 'J',
        "short" => 'S',
        "boolean" => 'Z',
        "void" => 'V',
        _ => return None,
    })
}

fn split_type_arguments(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < s.len() {
        parts.push(&s[start..]);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_signatures() {
        assert_eq!(create_type_signature("int"), "I");
        assert_eq!(create_type_signature("String[]"), "[QString;");
        assert_eq!(create_type_signature("String..."), "[QString;");
        assert_eq!(
            create_type_signature("Map<String, List<? extends T>>"),
            "QMap<QString;QList<+QT;>;>;"
        );
    }

    #[test]
    fn descriptors_split_into_parameters() {
        let (params, ret) = parse_method_descriptor("(I[Ljava/lang/String;J)V").unwrap();
        assert_eq!(params, vec!["I", "[Ljava.lang.String;", "J"]);
        assert_eq!(ret, "V");
        assert!(parse_method_descriptor("(Q)V").is_none());
    }

    #[test]
    fn readable_forms() {
        assert_eq!(to_readable("[I", false), "int[]");
        assert_eq!(to_readable("Ljava.lang.String;", false), "String");
        assert_eq!(to_readable("Ljava.lang.String;", true), "java.lang.String");
        assert_eq!(to_readable("QMap<QString;*>;", false), "Map<String, ?>");
    }
}
