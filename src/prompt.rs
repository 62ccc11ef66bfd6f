//! Prompt construction for subject-line analysis.

use crate::analysis::{JsonReply, ResponseFormat};

const INSTRUCTIONS: &str = r#"##Task

Act as a professional Email Marketer. I will give you a subject line in the INPUT section, delimited by triple backticks. Generate a score, a template, and a topic classification for it based on the three criteria below.
Give the final result immediately, using only the output format given at the end.

##Criteria

1. Template Creation:
Generate a generic template from the subject line.
Replace the unique elements of the original subject line with placeholders such as [X] or something more descriptive, while preserving the overall structure so it can be reused in other niches.

2. Professional Subject Line Analysis:
Analyze the subject line against the criteria below and produce an overall effectiveness score.

    - Effectiveness: Score out of 100 representing the overall impact and engagement potential, computed as a weighted combination of:
    - Scannability: Score out of 10 indicating how easily the main message is understood.
    - Sentiment: Score out of 10 assessing the emotional tone conveyed.
    - Spam Triggers: Score out of 10 evaluating the likelihood of triggering spam filters. Weighted higher because of its negative impact on effectiveness.
    - All Caps Words: Score out of 10 noting words written entirely in capital letters. Weighted higher because of its negative impact on effectiveness.
    - Emojis: Score out of 10 assessing the impact of emojis on the efficiency of the subject line.

    Higher Scannability, Sentiment and Emojis scores raise effectiveness; higher Spam Triggers and All Caps Words scores lower it.

3. Subject Line Type Classification:
Classify the subject line as exactly one of: Informational, Announcement, Promotion, Generic, Cold, or Survey.
"#;

const EXAMPLES: [(&str, &str, &str, &str); 5] = [
    (
        "2 Questions YouTubers Need To Stop Asking",
        "90",
        "[X] Questions [Audience] Need To Stop Asking",
        "Informational",
    ),
    (
        "I need to give you more money",
        "76",
        "I need to give you more [X]",
        "Announcement",
    ),
    (
        "👔 3 years in 3 hours",
        "91",
        "[Emoji] [X] years in [X] hours",
        "Generic",
    ),
    (
        "3 ways to trick AI content detectors 🤖",
        "87",
        "3 ways to [Achieve Goal] [Emoji]",
        "Informational",
    ),
    (
        "Simple Way to Boost Conversions with Your Email Marketing",
        "88",
        "Simple Way to [Goal] with Your [Type of Marketing]",
        "Promotion",
    ),
];

/// Build the full prompt for one subject line
pub fn build_prompt(subject_line: &str, format: ResponseFormat) -> String {
    let subject_line = subject_line.trim();
    let mut prompt = String::from(INSTRUCTIONS);

    prompt.push_str("\n##Output Examples:\n");
    for (input, score, template, category) in EXAMPLES {
        prompt.push_str(&format!("\nInput: \"{input}\"\n"));
        prompt.push_str(&render_example(input, score, template, category, format));
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "\n##INPUT\n\nSubject Line: ```[{subject_line}]```\n"
    ));

    match format {
        ResponseFormat::List => prompt.push_str(
            "\n##OUTPUT FORMAT\nThe output must be a list in the format shown below and nothing else.\n[Score, Template, Topic]\n",
        ),
        ResponseFormat::Json => {
            prompt.push_str(&format!(
                r#"
##OUTPUT FORMAT
You MUST respond with a single JSON object matching this JSON schema:
{}

Do not include any markdown formatting, code blocks, or explanations. Only output the raw JSON object.
"#,
                json_schema()
            ));
        }
    }

    prompt
}

fn render_example(
    input: &str,
    score: &str,
    template: &str,
    category: &str,
    format: ResponseFormat,
) -> String {
    match format {
        ResponseFormat::List => serde_json::json!([score, template, category]).to_string(),
        ResponseFormat::Json => serde_json::json!({
            "subject_line": input,
            "score": score,
            "template": template,
            "category": category,
        })
        .to_string(),
    }
}

fn json_schema() -> String {
    let schema = schemars::schema_for!(JsonReply);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
