/// Lowercasing tokenizer shared by indexing and querying.
///
/// Splits on every non-alphanumeric character, so punctuation and
/// whitespace never end up inside a token.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
