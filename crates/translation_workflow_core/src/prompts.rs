//! crates/translation_workflow_core/src/prompts.rs
//!
//! Pure prompt templates for the three oracle-driven stages. Each template keeps
//! paragraph breaks and a professional tone; translate and edit also carry the
//! gold-standard few-shot block.

use crate::domain::{GoldExample, Language};

const GOLD_STANDARD_HEADER: &str = "\n\nHere are some 'gold standard' examples of English-to-Portuguese translations to guide your tone and terminology. Follow these examples closely:\n";

/// Renders the few-shot block appended to the translate and edit prompts.
///
/// Returns an empty string when there are no pairs. Pairs with an empty side are
/// skipped, but keep their 1-based position in the numbering.
pub fn gold_standard_block(examples: &[GoldExample]) -> String {
    if examples.is_empty() {
        return String::new();
    }

    let mut block = String::from(GOLD_STANDARD_HEADER);
    for (i, example) in examples.iter().enumerate() {
        if example.source.is_empty() || example.target.is_empty() {
            continue;
        }
        block.push_str(&format!("\n--- Gold Standard Example {} ---\n", i + 1));
        block.push_str(&format!("[English]:\n{}\n", example.source));
        block.push_str(&format!("[Portuguese]:\n{}\n", example.target));
        block.push_str("--- End Example ---\n");
    }
    block
}

/// Translator persona.
pub fn translate_prompt(
    source_lang: Language,
    target_lang: Language,
    examples: &[GoldExample],
    source_text: &str,
) -> String {
    format!(
        "You are a professional {source_lang}-to-{target_lang} translator.\n\
         Translate the following text. Maintain a professional tone and ensure accuracy.\n\
         Preserve paragraph breaks (indicated by newlines).\n\
         {gold}\n\
         ---\n\
         Source Text to Translate:\n\
         {source_text}\n\
         ---\n\
         {target_lang} Translation:",
        gold = gold_standard_block(examples),
    )
}

/// Editor persona: compares the draft against the source text.
pub fn edit_prompt(
    source_lang: Language,
    target_lang: Language,
    examples: &[GoldExample],
    source_text: &str,
    translation: &str,
) -> String {
    format!(
        "You are a professional editor. Review the following translation from {source_lang} to {target_lang}.\n\
         Compare it against the source text for accuracy, terminology, and tone.\n\
         Correct any stylistic or grammatical issues to improve fluency. Preserve paragraph breaks.\n\
         {gold}\n\
         ---\n\
         Source Text:\n\
         {source_text}\n\
         ---\n\
         Initial Translation to Review:\n\
         {translation}\n\
         ---\n\
         Provide only the final, improved {target_lang} translation:",
        gold = gold_standard_block(examples),
    )
}

/// Proofreader persona: a single-text correctness pass, no source and no examples.
pub fn proofread_prompt(target_lang: Language, text: &str) -> String {
    format!(
        "You are a meticulous proofreader. Perform a final check on the following {target_lang} text.\n\
         Correct only objective errors (typos, grammar, punctuation). Preserve paragraph breaks.\n\
         Do NOT change the style or word choice unless it's grammatically incorrect.\n\
         ---\n\
         Text to Proofread:\n\
         {text}\n\
         ---\n\
         Provide only the final, proofread text:"
    )
}
