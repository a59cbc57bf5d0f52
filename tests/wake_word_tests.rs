// Integration tests for wake phrase detection

use jarvis_voice::{WakeMatch, WakeWordDetector};

fn detector() -> WakeWordDetector {
    WakeWordDetector::default()
}

#[test]
fn test_wake_phrase_with_command() {
    let found = detector().detect("hey jarvis open spotify");

    assert_eq!(
        found,
        Some(WakeMatch {
            phrase: "hey jarvis".to_string(),
            command: "open spotify".to_string(),
        })
    );
}

#[test]
fn test_match_is_case_insensitive_and_keeps_command_case() {
    let found = detector().detect("Hey JARVIS, Open Spotify!").expect("match");

    assert_eq!(found.phrase, "hey jarvis");
    assert_eq!(found.command, "Open Spotify");
}

#[test]
fn test_wake_phrase_alone_has_empty_command() {
    for text in ["hello jarvis", "Hello Jarvis.", "  hey jarvis ,  "] {
        let found = detector().detect(text).expect("match");
        assert_eq!(found.command, "", "input: {:?}", text);
    }
}

#[test]
fn test_phrase_anywhere_in_utterance() {
    let found = detector().detect("um hey jarvis what time is it").expect("match");

    assert_eq!(found.command, "what time is it");
}

#[test]
fn test_no_wake_phrase() {
    assert_eq!(detector().detect("open spotify"), None);
    assert_eq!(detector().detect("jarvis"), None);
    assert_eq!(detector().detect(""), None);
}

#[test]
fn test_first_configured_phrase_wins() {
    let text = "hello jarvis hey jarvis play music";

    let found = detector().detect(text).expect("match");
    assert_eq!(found.phrase, "hey jarvis");
    assert_eq!(found.command, "play music");

    let reversed = WakeWordDetector::new(["hello jarvis", "hey jarvis"]);
    let found = reversed.detect(text).expect("match");
    assert_eq!(found.phrase, "hello jarvis");
    assert_eq!(found.command, "hey jarvis play music");
}

#[test]
fn test_first_occurrence_is_used() {
    let found = detector()
        .detect("hey jarvis say hey jarvis")
        .expect("match");

    assert_eq!(found.command, "say hey jarvis");
}

#[test]
fn test_phrases_are_normalized() {
    let detector = WakeWordDetector::new(["  OK Computer ", "", "   "]);

    assert_eq!(detector.phrases(), ["ok computer".to_string()]);
    assert_eq!(
        detector.detect("ok computer lights off").map(|m| m.command),
        Some("lights off".to_string())
    );
}

#[test]
fn test_command_case_kept_when_lowercasing_changes_lengths() {
    // U+023A grows and the Kelvin sign U+212A shrinks when lowercased
    let found = detector()
        .detect("\u{23A}\u{23A}hey jarvis open \u{212A} door")
        .expect("match");

    assert_eq!(found.phrase, "hey jarvis");
    assert_eq!(found.command, "open \u{212A} door");
}

#[test]
fn test_non_ascii_prefix_before_phrase() {
    let found = detector().detect("Ärger, HEY Jarvis: Öffne Tür").expect("match");

    assert_eq!(found.command, "Öffne Tür");
}
