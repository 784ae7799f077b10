//! Turns accumulated stream text into a stored result.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::models::{GenerationParams, GenerationResult, Performance};

const MARKDOWN_OPENER: &str = "```markdown";
const FENCE: &str = "```";

/// Strips a wrapping ```` ```markdown ```` fence that the model sometimes adds, then trims.
///
/// A leading fence line tagged `markdown` comes off together with the trailing fence
/// that closes it. A trailing bare fence with no opener is removed only when it is
/// unbalanced, so a code block that ends the text keeps its closing fence. Fences
/// elsewhere are left alone, and `finalize(finalize(x)) == finalize(x)`.
pub fn finalize(raw: &str) -> String {
    let mut text = raw.trim();
    loop {
        if let Some(rest) = strip_markdown_opener(text) {
            let rest = rest.trim_end();
            text = rest.strip_suffix(FENCE).unwrap_or(rest).trim();
            continue;
        }
        if text.matches(FENCE).count() % 2 == 1 {
            if let Some(rest) = text.strip_suffix(FENCE) {
                text = rest.trim();
                continue;
            }
        }
        return text.to_string();
    }
}

fn strip_markdown_opener(text: &str) -> Option<&str> {
    let rest = text.strip_prefix(MARKDOWN_OPENER)?;
    rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n"))
}

static LAST_ID_MILLIS: AtomicI64 = AtomicI64::new(0);

/// `res-<unix millis>` of the completion instant, bumped forward when two completions
/// share a millisecond so ids stay unique and ordered within the process.
fn next_result_id(completed_at: DateTime<Utc>) -> String {
    let now = completed_at.timestamp_millis();
    let mut last = LAST_ID_MILLIS.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_ID_MILLIS.compare_exchange_weak(last, candidate, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return format!("res-{}", candidate),
            Err(actual) => last = actual,
        }
    }
}

pub fn package(params: GenerationParams, raw_output: &str, elapsed: Duration, completed_at: DateTime<Utc>) -> GenerationResult {
    GenerationResult {
        id: next_result_id(completed_at),
        params,
        output: finalize(raw_output),
        timestamp: completed_at,
        performance: Performance { generation_time_ms: elapsed.as_millis() as u64 },
    }
}

/// File name offered when a result is downloaded as markdown.
pub fn download_file_name(result: &GenerationResult) -> String {
    format!("creative-writer-ai-{}.md", result.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_markdown_wrapper() {
        assert_eq!(finalize("```markdown\nHello\n```"), "Hello");
        assert_eq!(finalize("```markdown\r\nHello\r\n```\n"), "Hello");
    }

    #[test]
    fn clean_text_is_unchanged() {
        assert_eq!(finalize("Hello"), "Hello");
        assert_eq!(finalize("  Hello\n\n"), "Hello");
    }

    #[test]
    fn inner_and_other_fences_are_left_alone() {
        let text = "Intro\n```rust\nfn main() {}\n```\nOutro";
        assert_eq!(finalize(text), text);
        assert_eq!(finalize("```rust\ncode"), "```rust\ncode");
        assert_eq!(finalize("```markdownish\nx"), "```markdownish\nx");
    }

    #[test]
    fn code_block_closing_the_text_keeps_its_fence() {
        let wrapped = "```markdown\nA spell scroll:\n```text\nLumos\n```\n```";
        assert_eq!(finalize(wrapped), "A spell scroll:\n```text\nLumos\n```");
        let bare = "A spell scroll:\n```text\nLumos\n```";
        assert_eq!(finalize(bare), bare);
        assert_eq!(finalize("Hello\n```"), "Hello");
    }

    #[test]
    fn is_idempotent() {
        let samples = [
            "",
            "```",
            "``````",
            "Hello",
            "```markdown\nHello\n```",
            "```markdown\n```markdown\nnested\n```\n```",
            "  ```markdown\n  padded  \n```  ",
            "text ending in fence```",
            "```markdown\n",
            "Intro\n```rust\nfn main() {}\n```",
            "```markdown\nA spell scroll:\n```text\nLumos\n```\n```",
            "x\n```\n```\n```",
        ];
        for s in samples {
            let once = finalize(s);
            assert_eq!(finalize(&once), once, "input: {s:?}");
        }
    }

    #[test]
    fn package_records_timing_and_cleans_output() {
        let at = Utc::now();
        let result = package(GenerationParams::default(), "```markdown\nA tale\n```", Duration::from_millis(1234), at);
        assert_eq!(result.output, "A tale");
        assert_eq!(result.performance.generation_time_ms, 1234);
        assert_eq!(result.timestamp, at);
        assert!(result.id.starts_with("res-"));
    }

    #[test]
    fn ids_are_unique_within_one_millisecond() {
        let at = Utc::now();
        let a = next_result_id(at);
        let b = next_result_id(at);
        assert_ne!(a, b);
        let millis = |id: &str| id.trim_start_matches("res-").parse::<i64>().unwrap();
        assert!(millis(&b) > millis(&a));
    }

    #[test]
    fn download_name_uses_the_result_id() {
        let result = package(GenerationParams::default(), "x", Duration::ZERO, Utc::now());
        assert_eq!(download_file_name(&result), format!("creative-writer-ai-{}.md", result.id));
    }
}
