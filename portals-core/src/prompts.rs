//! Prompt templates for the three oracle consultations.

/// Substring whose presence marks a resonant verse.
pub const RESONANCE_MARKER: &str = "High Resonance";

/// Stands in for the campaign history before any chapter exists.
pub const FIRST_CHAPTER_MARKER: &str = "(This is the first chapter. Nothing has happened yet.)";

/// Ask whether the verse fits the most recent chapter.
pub fn resonance_prompt(paragraph: &str, last_chapter: &str) -> String {
    format!(
        r#"Analyze the semantic resonance between the following D&D campaign chapter and a religious text paragraph. The campaign is about angels, demons, and the apocalypse.

Last Campaign Chapter: "{last_chapter}"

Religious Paragraph: "{paragraph}"

Does the religious paragraph semantically match the themes of the chapter? Respond with only "High Resonance" or "Low Resonance"."#
    )
}

/// Ask which kind of story element the verse inspires.
pub fn entity_prompt(paragraph: &str, chart: Option<&str>) -> String {
    let mut prompt = format!(
        r#"Read the following religious text paragraph. Based on its contents, what kind of Dungeons & Dragons entity does it most inspire? Choose from one of the following categories:

- Magic Artifact (e.g., a sword, crown, scroll, chalice)
- New Scenario (e.g., a trial, a journey, a betrayal, a siege)
- New Monster (e.g., a beast, a creature from the abyss, a corrupted angel)
- New Character (e.g., a prophet, a king, a fallen hero, a divine messenger)
- New Location (e.g., a forgotten temple, a heavenly gate, a pit to the underworld)

The Paragraph: "{paragraph}"
"#
    );

    if let Some(chart) = chart {
        prompt.push_str(&format!(
            r#"
The stars on this day read as follows. Let them tip the balance between categories:

{chart}
"#
        ));
    }

    prompt.push_str("\nRespond with only the chosen category name.");
    prompt
}

/// Ask for the next chapter.
///
/// `history` is the full text of every prior chapter, or `None` for the
/// first chapter.
pub fn chapter_prompt(history: Option<&str>, paragraph: &str, entity: &str, chart: Option<&str>) -> String {
    let history = history.unwrap_or(FIRST_CHAPTER_MARKER);

    let mut prompt = format!(
        r#"You are a Dungeons & Dragons Dungeon Master. Write the next chapter for a campaign about angels, demons, and the end of the world. The player can die but can be resurrected with the correct holy verse.

Campaign History So Far:
{history}

The theme of the chapter is based from the following holy text:
"{paragraph}"

The new element you must introduce to the story is a: "{entity}".
"#
    );

    if let Some(chart) = chart {
        prompt.push_str(&format!(
            r#"
The heavens above the campaign are arranged like this. Let the major aspects colour the mood and omens of the chapter:

{chart}
"#
        ));
    }

    prompt.push_str(&format!(
        "\nWrite the next chapter of the campaign. It should be about 2-3 paragraphs long. Weave the inspiration from the holy text into the narrative. Introduce a new challenge, decision, or discovery for the player based on the new {entity}. End the chapter on a compelling note."
    ));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resonance_prompt_embeds_both_texts() {
        let prompt = resonance_prompt("In the beginning", "The feather fell");
        assert!(prompt.contains("Religious Paragraph: \"In the beginning\""));
        assert!(prompt.contains("Last Campaign Chapter: \"The feather fell\""));
        assert!(prompt.contains(RESONANCE_MARKER));
    }

    #[test]
    fn test_entity_prompt_without_chart() {
        let prompt = entity_prompt("verse", None);
        assert!(prompt.contains("The Paragraph: \"verse\""));
        assert!(!prompt.contains("stars"));
        assert!(prompt.ends_with("Respond with only the chosen category name."));
    }

    #[test]
    fn test_entity_prompt_with_chart() {
        let prompt = entity_prompt("verse", Some("- Sun trine Moon (orb: 1.00°)"));
        assert!(prompt.contains("- Sun trine Moon (orb: 1.00°)"));
        assert!(prompt.ends_with("Respond with only the chosen category name."));
    }

    #[test]
    fn test_chapter_prompt_first_chapter() {
        let prompt = chapter_prompt(None, "verse", "New Monster", None);
        assert!(prompt.contains(FIRST_CHAPTER_MARKER));
        assert!(prompt.contains("is a: \"New Monster\""));
        assert!(prompt.contains("based on the new New Monster"));
    }

    #[test]
    fn test_chapter_prompt_with_history_and_chart() {
        let prompt = chapter_prompt(Some("one\ntwo"), "verse", "New Location", Some("CHART"));
        assert!(prompt.contains("Campaign History So Far:\none\ntwo\n"));
        assert!(!prompt.contains(FIRST_CHAPTER_MARKER));
        assert!(prompt.contains("CHART"));
    }
}
