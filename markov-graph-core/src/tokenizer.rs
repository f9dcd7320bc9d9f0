//! Reference tokenizer producing the token stream the graph trains on.
//!
//! Tokens are lowercase words plus two normalized markers: `.` for the end
//! of a sentence and `,` for the end of a phrase. The graph spaces and
//! capitalizes its output around exactly these two literals.

/// Sentence-terminal marker.
pub const SENTENCE_END: &str = ".";

/// Phrase-terminal marker.
pub const PHRASE_END: &str = ",";

fn is_sentence_mark(c: char) -> bool {
	matches!(c, '.' | '?' | '!' | ';')
}

fn is_phrase_mark(c: char) -> bool {
	matches!(c, ',' | ':' | '(' | ')')
}

/// Splits raw text into tokens.
///
/// - Runs of `.?!;` become a standalone `.`
/// - `--` and runs of `,:()` become a standalone `,`
/// - Double quotes are dropped, as are single quotes next to whitespace
///   (apostrophes inside words and quotes at either end of the text are kept)
/// - Text is lowercased, except the pronoun `I` and its contractions
///
/// Example: `"Wait -- I'm here!"` → `["wait", ",", "I'm", "here", "."]`
pub fn tokenize(text: &str) -> Vec<String> {
	let chars: Vec<char> = text.chars().collect();
	let mut spaced = String::with_capacity(text.len() + 16);

	let mut i = 0;
	while i < chars.len() {
		let c = chars[i];

		if is_sentence_mark(c) {
			while i < chars.len() && is_sentence_mark(chars[i]) {
				i += 1;
			}
			spaced.push_str(" . ");
			continue;
		}

		if c == '-' && chars.get(i + 1) == Some(&'-') {
			i += 2;
			spaced.push_str(" , ");
			continue;
		}

		if is_phrase_mark(c) {
			while i < chars.len() && is_phrase_mark(chars[i]) {
				i += 1;
			}
			spaced.push_str(" , ");
			continue;
		}

		let quote_at_boundary = c == '\''
			&& ((i > 0 && chars[i - 1].is_whitespace())
				|| chars.get(i + 1).is_some_and(|next| next.is_whitespace()));
		if c != '"' && !quote_at_boundary {
			spaced.push(c);
		}
		i += 1;
	}

	spaced
		.to_lowercase()
		.split_whitespace()
		.map(restore_pronoun)
		.collect()
}

fn restore_pronoun(token: &str) -> String {
	if token == "i" {
		"I".to_owned()
	} else if let Some(rest) = token.strip_prefix("i'") {
		format!("I'{rest}")
	} else {
		token.to_owned()
	}
}

/// Upper-cases the first character of `word` when it has a case.
pub fn capitalize(word: &str) -> String {
	let mut chars = word.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn normalizes_punctuation() {
		assert_eq!(
			tokenize("Hello, World! How are you?? Fine; thanks (mostly)."),
			vec!["hello", ",", "world", ".", "how", "are", "you", ".", "fine", ".", "thanks", ",", "mostly", ",", "."]
		);
	}

	#[test]
	fn double_dash_is_a_phrase_break() {
		assert_eq!(tokenize("Wait -- I'm here!"), vec!["wait", ",", "I'm", "here", "."]);
	}

	#[test]
	fn drops_quotes_but_keeps_apostrophes() {
		assert_eq!(
			tokenize(r#"She said "don't" and 'left' it"#),
			vec!["she", "said", "don't", "and", "left", "it"]
		);
	}

	#[test]
	fn quotes_at_text_edges_are_kept() {
		assert_eq!(tokenize("'tis the season'"), vec!["'tis", "the", "season'"]);
	}

	#[test]
	fn restores_the_pronoun() {
		assert_eq!(tokenize("i think i'll go, i said"), vec!["I", "think", "I'll", "go", ",", "I", "said"]);
	}

	#[test]
	fn blank_text_has_no_tokens() {
		assert!(tokenize(" \t\n ").is_empty());
		assert!(tokenize("").is_empty());
	}

	#[test]
	fn capitalize_first_letter_only() {
		assert_eq!(capitalize("hello world"), "Hello world");
		assert_eq!(capitalize("élan"), "Élan");
		assert_eq!(capitalize(","), ",");
		assert_eq!(capitalize(""), "");
	}
}
