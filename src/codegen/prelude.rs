pub const CPP_HEADERS: &str = r#"#include <algorithm>
#include <cstdlib>
#include <iostream>
#include <sstream>
#include <string>
#include <utility>
#include <vector>

using namespace std;

"#;

/// Backs `str(x)`: streams the value so doubles print like `3.14` rather
/// than `to_string`'s fixed six decimals.
pub const CPP_PY_STR: &str = r#"template <typename T>
string py_str(const T& value) {
    ostringstream out;
    out << value;
    return out.str();
}

"#;

/// Escapes a string literal body for a C++ double-quoted literal. Backslash
/// escapes from the source pass through untouched; bare double quotes (legal
/// inside single-quoted source strings) are escaped.
pub fn escape_cpp_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                escaped.push('\\');
                if let Some(next) = chars.next() {
                    escaped.push(next);
                }
            }
            '"' => escaped.push_str("\\\""),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_bare_quotes_only() {
        assert_eq!(escape_cpp_string(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_cpp_string(r#"a\"b\n"#), r#"a\"b\n"#);
        assert_eq!(escape_cpp_string(r"it\'s"), r"it\'s");
    }
}
