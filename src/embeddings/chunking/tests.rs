use super::*;

#[test]
fn ocean_sentences() {
    let chunks = chunk_text("The ocean is deep. The ocean is salty. Fish live there.");
    assert_eq!(
        chunks,
        vec!["The ocean is deep", " The ocean is salty", " Fish live there"]
    );
}

#[test]
fn surrounding_whitespace_is_trimmed_before_splitting() {
    let chunks = chunk_text("  \n Argo floats drift. They profile temperature.\t\n");
    assert_eq!(chunks, vec!["Argo floats drift", " They profile temperature"]);
}

#[test]
fn empty_segments_are_dropped() {
    assert_eq!(chunk_text("A..B...C"), vec!["A", "B", "C"]);
    assert!(chunk_text("...").is_empty());
    assert!(chunk_text("").is_empty());
    assert!(chunk_text("   ").is_empty());
}

#[test]
fn whitespace_only_segments_are_kept() {
    let chunks = chunk_text("Salinity rises. . Depth matters");
    assert_eq!(chunks, vec!["Salinity rises", " ", " Depth matters"]);
}

#[test]
fn text_without_periods_is_a_single_chunk() {
    let chunks = chunk_text("Chlorophyll concentration near the surface");
    assert_eq!(chunks, vec!["Chlorophyll concentration near the surface"]);
}

#[test]
fn chunk_count_matches_non_empty_segments() {
    let sentences = ["one", "two", "three", "four", "five", "six", "seven"];
    for k in 1..=sentences.len() {
        let text = sentences[..k].join(". ") + ".";
        let chunks = chunk_text(&text);
        assert_eq!(chunks.len(), k, "text: {text:?}");
        assert_eq!(chunks[0], "one");
        for (i, chunk) in chunks.iter().enumerate().skip(1) {
            assert_eq!(chunk, &format!(" {}", sentences[i]));
        }
    }
}

#[test]
fn no_length_limit_or_merging() {
    let long_sentence = "word ".repeat(5_000);
    let text = format!("{long_sentence}. a. b");
    let chunks = chunk_text(&text);
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].trim_end(), long_sentence.trim_end());
    assert_eq!(chunks[1], " a");
    assert_eq!(chunks[2], " b");
}

#[test]
fn chunks_are_substrings_in_order() {
    let text = "Deep water forms near the poles. It sinks. It spreads along the floor.";
    let chunks = chunk_text(text);
    let mut cursor = 0;
    for chunk in &chunks {
        let found = text[cursor..]
            .find(chunk.as_str())
            .expect("chunk should appear after the previous one");
        cursor += found + chunk.len();
    }
}
