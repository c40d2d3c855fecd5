use crate::error::DownloadError;
use crate::models::DownloadReport;

/// Filename used when the output mentions an mp3 but no path segment can be isolated.
pub const FALLBACK_FILENAME: &str = "downloaded-audio.mp3";

/// Interpret the stdout of a downloader that exited with code 0.
///
/// Tried in order:
/// 1. the whole output as a JSON report
/// 2. JSON objects embedded in log text (last one first)
/// 3. an `.mp3` path mentioned in the log text
///
/// Returns the filename the downloader claims to have written.
pub fn parse_stdout(stdout: &str) -> Result<String, DownloadError> {
    if let Ok(report) = serde_json::from_str::<DownloadReport>(stdout.trim()) {
        return filename_from_report(report);
    }

    if let Some(report) = find_embedded_report(stdout) {
        return filename_from_report(report);
    }

    if let Some(filename) = scrape_mp3_filename(stdout) {
        return Ok(filename);
    }

    Err(DownloadError::Unparseable)
}

fn filename_from_report(report: DownloadReport) -> Result<String, DownloadError> {
    if !report.success {
        let msg = report
            .error
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| "다운로더가 실패를 보고했습니다".to_string());
        return Err(DownloadError::Reported(msg));
    }
    match report.filename {
        Some(name) if !name.trim().is_empty() => Ok(name),
        _ => Err(DownloadError::Unparseable),
    }
}

/// Scan for balanced `{...}` objects and return the last one that is a report.
fn find_embedded_report(text: &str) -> Option<DownloadReport> {
    let candidates = json_object_spans(text);
    candidates
        .iter()
        .rev()
        .find_map(|&(start, end)| serde_json::from_str::<DownloadReport>(&text[start..end]).ok())
}

/// Byte ranges of every balanced brace span, outermost only.
/// Braces inside JSON strings are ignored. A `{` that never closes is
/// skipped and the scan resumes right after it.
fn json_object_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut pos = 0usize;

    while let Some(offset) = text[pos..].find('{') {
        let start = pos + offset;
        match balanced_end(text, start) {
            Some(end) => {
                spans.push((start, end));
                pos = end;
            }
            None => pos = start + 1,
        }
    }

    spans
}

/// End offset (exclusive) of the object opened by the `{` at `start`.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// `"success": false` in any spacing.
fn reports_failure(text: &str) -> bool {
    text.match_indices("\"success\"").any(|(i, key)| {
        let rest = text[i + key.len()..].trim_start();
        rest.strip_prefix(':')
            .map(|value| value.trim_start().starts_with("false"))
            .unwrap_or(false)
    })
}

/// Best-effort filename from human-readable log output.
///
/// yt-dlp style `Destination: /dir/name.mp3` lines win; otherwise the first
/// path segment ending in `.mp3`. Output that reports `"success": false`
/// (with or without spaces) is never treated as a success.
fn scrape_mp3_filename(text: &str) -> Option<String> {
    if !text.contains(".mp3") || reports_failure(text) {
        return None;
    }

    let destination = text
        .lines()
        .filter_map(|line| line.split_once("Destination:").map(|(_, rest)| rest))
        .find_map(trailing_mp3_segment);

    destination
        .or_else(|| text.lines().find_map(trailing_mp3_segment))
        .or_else(|| Some(FALLBACK_FILENAME.to_string()))
}

/// The segment after the last path separator, cut at its last `.mp3`.
/// Requires at least one separator before the segment.
fn trailing_mp3_segment(line: &str) -> Option<String> {
    let line = line.trim();
    let segments: Vec<&str> = line.split(['/', '\\']).collect();
    if segments.len() < 2 {
        return None;
    }

    segments[1..].iter().find_map(|segment| {
        let end = segment.rfind(".mp3")? + ".mp3".len();
        let name = &segment[..end];
        if name.len() > ".mp3".len() {
            Some(name.to_string())
        } else {
            None
        }
    })
}
