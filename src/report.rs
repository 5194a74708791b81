// src/report.rs
// Plain-text renderings of a classification result

use crate::workflow::ClassificationResult;
use chrono::NaiveDateTime;

/// Full report: top match followed by every ranked match
pub fn render_report(result: &ClassificationResult, generated_at: NaiveDateTime) -> String {
    let top = result.top();
    let mut lines = vec![
        "Doggy Detective Report".to_string(),
        format!(
            "Generated on: {} at {}",
            generated_at.format("%Y-%m-%d"),
            generated_at.format("%H:%M:%S")
        ),
        String::new(),
        "Top Breed Match:".to_string(),
        format!("{} ({:.1}% confidence)", top.breed, top.confidence),
        String::new(),
        "All Breed Matches:".to_string(),
    ];
    for (i, prediction) in result.iter().enumerate() {
        lines.push(format!(
            "{}. {} ({:.1}%)",
            i + 1,
            prediction.breed,
            prediction.confidence
        ));
    }
    lines.push(String::new());
    lines.push("Thank you for using Doggy Detective!".to_string());
    lines.join("\n")
}

/// One-line message for sharing the top match
pub fn share_text(result: &ClassificationResult) -> String {
    let top = result.top();
    format!(
        "Can't believe my dog is {:.1}% {}! Take a look at what Doggy Detective discovered about my furry friend.",
        top.confidence, top.breed
    )
}
