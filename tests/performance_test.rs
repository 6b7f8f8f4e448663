//! Performance tests for rxls
//!
//! Scanning is dominated by the directory walk; matching must not add
//! noticeable overhead even for backtracking patterns.

use rxls::{PatternMatcher, ScanConfig, Scanner, WalkLister};
use std::fs;
use std::time::Instant;
use tempfile::TempDir;

#[test]
fn test_scan_thousand_files_performance() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    for dir in 0..10 {
        let sub = root.join(format!("dir_{}", dir));
        fs::create_dir_all(&sub).unwrap();
        for i in 0..100 {
            let ext = if i % 2 == 0 { "mp4" } else { "mkv" };
            fs::write(sub.join(format!("clip_{}.{}", i, ext)), "").unwrap();
        }
    }

    let config = ScanConfig {
        root: root.to_path_buf(),
        ..Default::default()
    };
    let scanner = Scanner::new(config.root.clone(), WalkLister::new(&config));

    let start = Instant::now();
    let report = scanner.scan(r"clip_\d+\.mp4$").unwrap();
    let duration = start.elapsed();

    assert_eq!(report.scanned, 1000);
    assert_eq!(report.match_count(), 500);

    assert!(
        duration.as_millis() < 5000,
        "Scanning 1000 files took {}ms, expected < 5000ms",
        duration.as_millis()
    );
}

#[test]
fn test_matcher_reuse_performance() {
    let mut matcher = PatternMatcher::new(r"(\w)\1.*\.mp4$");
    let subjects: Vec<String> = (0..10_000)
        .map(|i| format!("/video/season_{}/episode_{}.mp4", i % 7, i))
        .collect();

    let start = Instant::now();
    let matched = subjects.iter().filter(|s| matcher.matches(s)).count();
    let duration = start.elapsed();

    assert_eq!(matched, subjects.iter().filter(|s| has_double_word_char(s)).count());
    assert!(
        duration.as_millis() < 5000,
        "10k backtracking matches took {}ms, expected < 5000ms",
        duration.as_millis()
    );
}

fn has_double_word_char(s: &str) -> bool {
    let chars: Vec<char> = s.chars().collect();
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    chars
        .windows(2)
        .any(|w| is_word(w[0]) && w[0].eq_ignore_ascii_case(&w[1]))
}
