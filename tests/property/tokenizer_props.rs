//! Tokenizer invariants: purity, SIMD/scalar equivalence, dense positions.

use proptest::prelude::*;
use rtrv::{StemmerType, Tokenizer};

fn text_strategy() -> impl Strategy<Value = String> {
    // A mix of words, punctuation, digits, apostrophes, and some
    // multi-byte characters.
    prop::string::string_regex("([a-zA-Z0-9']{0,10}|[ \t\n.,;!?\u{e9}\u{fc}\u{2014}]){0,40}")
        .unwrap()
}

fn any_tokenizer() -> impl Strategy<Value = Tokenizer> {
    (
        any::<bool>(),
        any::<bool>(),
        prop_oneof![
            Just(StemmerType::None),
            Just(StemmerType::Simple),
            Just(StemmerType::Porter)
        ],
    )
        .prop_map(|(lowercase, stopwords, stemmer)| {
            let mut tokenizer = Tokenizer::new();
            tokenizer.set_lowercase(lowercase);
            tokenizer.set_remove_stopwords(stopwords);
            tokenizer.set_stemmer(stemmer);
            tokenizer
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// SIMD and scalar paths emit byte-identical token streams.
    #[test]
    fn prop_simd_equals_scalar(text in text_strategy(), tokenizer in any_tokenizer()) {
        let scalar = tokenizer.tokenize_with_positions(&text);
        let mut vectored = tokenizer.clone();
        vectored.enable_simd(true);
        prop_assert_eq!(scalar, vectored.tokenize_with_positions(&text));
    }

    /// tokenize is a pure function of (text, configuration).
    #[test]
    fn prop_tokenize_is_stable(text in text_strategy(), tokenizer in any_tokenizer()) {
        prop_assert_eq!(tokenizer.tokenize(&text), tokenizer.tokenize(&text));
    }

    /// Emitted terms are non-empty; positions are dense 0..N-1; offsets
    /// point at the original text.
    #[test]
    fn prop_token_stream_well_formed(text in text_strategy(), tokenizer in any_tokenizer()) {
        let tokens = tokenizer.tokenize_with_positions(&text);
        for (i, token) in tokens.iter().enumerate() {
            prop_assert!(!token.text.is_empty());
            prop_assert_eq!(token.position as usize, i);
            prop_assert!(token.start < token.end);
            prop_assert!(token.end <= text.len());
            // The raw slice is a word run of the original text.
            let raw = &text[token.start..token.end];
            prop_assert!(raw.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'\''));
        }
    }

    /// tokenize() is exactly the text projection of tokenize_with_positions().
    #[test]
    fn prop_tokenize_matches_positions_projection(
        text in text_strategy(),
        tokenizer in any_tokenizer()
    ) {
        let texts: Vec<String> = tokenizer
            .tokenize_with_positions(&text)
            .into_iter()
            .map(|t| t.text)
            .collect();
        prop_assert_eq!(tokenizer.tokenize(&text), texts);
    }

    /// Empty input always yields an empty stream.
    #[test]
    fn prop_empty_input(tokenizer in any_tokenizer()) {
        prop_assert!(tokenizer.tokenize("").is_empty());
    }
}
