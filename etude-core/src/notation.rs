//! MusicXML payload for the notation renderer
//!
//! The engine only fills a fixed template: one part, one 4/4 measure, treble
//! clef. Notes that share a start offset with the previous note are emitted as
//! `<chord/>` members so block triads render stacked.

use crate::types::note::Pitch;
use crate::types::pattern::{PatternNote, PatternNotes};
use crate::types::time::{beats, to_divisions, Beats, DIVISIONS_PER_BEAT};

/// Beats in the single rendered measure
const MEASURE_BEATS: i64 = 4;

/// Render the notes of a pattern as a MusicXML 4.0 partwise document
pub fn render(notes: &PatternNotes) -> String {
    let mut xml = String::new();

    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(r#"<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 4.0 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">"#);
    xml.push('\n');
    xml.push_str(r#"<score-partwise version="4.0">"#);
    xml.push('\n');

    xml.push_str("  <part-list>\n");
    xml.push_str("    <score-part id=\"P1\">\n");
    xml.push_str("      <part-name>Practice</part-name>\n");
    xml.push_str("    </score-part>\n");
    xml.push_str("  </part-list>\n");

    xml.push_str("  <part id=\"P1\">\n");
    xml.push_str("    <measure number=\"1\">\n");
    xml.push_str(&attributes_xml());

    let mut previous_offset: Option<Beats> = None;
    let mut measure_end = beats(0);
    for note in notes.as_slice() {
        let is_chord_member = previous_offset == Some(note.start_offset());
        xml.push_str(&note_to_xml(note, is_chord_member));
        previous_offset = Some(note.start_offset());

        let note_end = note.start_offset() + note.duration();
        if note_end > measure_end {
            measure_end = note_end;
        }
    }

    let remaining = beats(MEASURE_BEATS) - measure_end;
    if remaining > beats(0) {
        xml.push_str(&rest_to_xml(remaining));
    }

    xml.push_str("    </measure>\n");
    xml.push_str("  </part>\n");
    xml.push_str("</score-partwise>\n");

    xml
}

fn attributes_xml() -> String {
    let mut xml = String::new();
    xml.push_str("      <attributes>\n");
    xml.push_str(&format!(
        "        <divisions>{}</divisions>\n",
        DIVISIONS_PER_BEAT
    ));
    xml.push_str("        <time>\n");
    xml.push_str(&format!("          <beats>{}</beats>\n", MEASURE_BEATS));
    xml.push_str("          <beat-type>4</beat-type>\n");
    xml.push_str("        </time>\n");
    xml.push_str("        <clef>\n");
    xml.push_str("          <sign>G</sign>\n");
    xml.push_str("          <line>2</line>\n");
    xml.push_str("        </clef>\n");
    xml.push_str("      </attributes>\n");
    xml
}

fn note_to_xml(note: &PatternNote, is_chord_member: bool) -> String {
    let mut xml = String::new();

    xml.push_str("      <note>\n");
    if is_chord_member {
        xml.push_str("        <chord/>\n");
    }

    // PatternNote already guarantees 0-127
    let (step, alter, octave) = match Pitch::from_midi(note.midi()) {
        Ok(pitch) => {
            let (step, alter) = pitch.step_and_alter();
            (step, alter, pitch.octave())
        }
        Err(_) => ('C', 0, 4),
    };

    xml.push_str("        <pitch>\n");
    xml.push_str(&format!("          <step>{}</step>\n", step));
    if alter != 0 {
        xml.push_str(&format!("          <alter>{}</alter>\n", alter));
    }
    xml.push_str(&format!("          <octave>{}</octave>\n", octave));
    xml.push_str("        </pitch>\n");

    let (divisions, kind, dotted) = duration_parts(note.duration());
    xml.push_str(&format!("        <duration>{}</duration>\n", divisions));
    xml.push_str(&format!("        <type>{}</type>\n", kind));
    if dotted {
        xml.push_str("        <dot/>\n");
    }

    match alter {
        1 => xml.push_str("        <accidental>sharp</accidental>\n"),
        -1 => xml.push_str("        <accidental>flat</accidental>\n"),
        _ => {}
    }

    xml.push_str("      </note>\n");
    xml
}

fn rest_to_xml(duration: Beats) -> String {
    let mut xml = String::new();
    let (divisions, kind, dotted) = duration_parts(duration);

    xml.push_str("      <note>\n");
    xml.push_str("        <rest/>\n");
    xml.push_str(&format!("        <duration>{}</duration>\n", divisions));
    xml.push_str(&format!("        <type>{}</type>\n", kind));
    if dotted {
        xml.push_str("        <dot/>\n");
    }
    xml.push_str("      </note>\n");
    xml
}

/// Divisions, MusicXML note type and dot flag for a beat duration.
///
/// Durations that do not map onto a standard (optionally dotted) value keep
/// their exact division count and are typed as quarters.
fn duration_parts(duration: Beats) -> (i64, &'static str, bool) {
    let divisions = to_divisions(duration).unwrap_or(DIVISIONS_PER_BEAT);
    let (kind, dotted) = match divisions {
        16 => ("whole", false),
        12 => ("half", true),
        8 => ("half", false),
        6 => ("quarter", true),
        4 => ("quarter", false),
        3 => ("eighth", true),
        2 => ("eighth", false),
        1 => ("16th", false),
        _ => ("quarter", false),
    };
    (divisions, kind, dotted)
}
