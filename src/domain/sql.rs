// SQL text quoting

/// Back-quote an identifier, doubling embedded back-quotes
pub fn quote_identifier(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

/// Single-quoted string literal with backslash escapes
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}
