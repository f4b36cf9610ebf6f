use super::*;

fn context(id: u64, text: &str) -> RetrievedChunk {
    RetrievedChunk {
        id,
        text: text.to_string(),
        score: 0.5,
    }
}

#[test]
fn prompt_layout() {
    let prompt = build_prompt(
        "What is the car loan tenure?",
        &[
            context(4, "Car loan tenure is up to 7 years."),
            context(9, "Processing fee is 0.25 percent."),
        ],
    );

    let expected = "Use ONLY the context below to answer the question.\n\
If the answer is not available in the context, say \"Not available in documents.\"\n\
\n\
### CONTEXT:\n\
[Chunk 4]\n\
Car loan tenure is up to 7 years.\n\
\n\
[Chunk 9]\n\
Processing fee is 0.25 percent.\n\
\n\
### QUESTION:\n\
What is the car loan tenure?\n\
\n\
### ANSWER:";

    assert_eq!(prompt, expected);
}

#[test]
fn question_is_verbatim() {
    let question = "  Rates for \"NRI\" {customers}?\n";
    let prompt = build_prompt(question, &[context(0, "text")]);

    assert!(prompt.contains("### QUESTION:\n  Rates for \"NRI\" {customers}?\n\n### ANSWER:"));
}

#[test]
fn no_contexts_leaves_empty_section() {
    let prompt = build_prompt("Anything?", &[]);

    assert!(prompt.contains("### CONTEXT:\n\n\n### QUESTION:\nAnything?"));
    assert!(prompt.ends_with("### ANSWER:"));
}

#[test]
fn long_context_is_not_truncated() {
    let text = "word ".repeat(5000);
    let prompt = build_prompt("q", &[context(1, text.trim())]);

    assert!(prompt.contains(text.trim()));
}
