//! Prompt templates for each kind of agent turn
//!
//! Every prompt starts with the agent's context string; the history travels
//! separately as chat messages.

use crate::value_objects::Agent;

/// First turn of an autonomous dialogue: nothing to respond to yet
pub fn opening(context: &str, speaker: &Agent, partner: &Agent, topic: &str) -> String {
    format!(
        "{context}\n\nYou are {speaker}, opening a professional discussion with {partner} \
         (a {partner_role}) about {topic}. Share your initial perspective naturally.",
        speaker = speaker.name,
        partner = partner.name,
        partner_role = partner.role,
    )
}

/// Regular autonomous turn answering the other agent
pub fn reply(context: &str, speaker: &Agent, previous: &Agent, last_utterance: &str) -> String {
    format!(
        "{context}\n\nYou are {speaker} in discussion with {previous}. \
         {previous} just said: \"{last_utterance}\"\n\n\
         Respond directly to their point and continue the discussion naturally.",
        speaker = speaker.name,
        previous = previous.name,
    )
}

/// Autonomous turn right after a human intervention
pub fn intervention(
    context: &str,
    previous: &Agent,
    human_name: &str,
    human_text: &str,
) -> String {
    format!(
        "{context}\n\n{human_name} just intervened in your discussion with {previous}. \
         They said: \"{human_text}\"\n\n\
         Address {human_name}'s point first, \
         then naturally bring {previous} back into the conversation.",
        previous = previous.name,
    )
}

/// Group chat answer to a human message
pub fn group(context: &str, human_name: &str, human_text: &str) -> String {
    format!("{context}\n\n{human_name} said: {human_text}\n\nRespond naturally.")
}

/// Private chat answer to a human message
pub fn private(context: &str, human_name: &str, human_text: &str) -> String {
    format!("{context}\n\nPrivate chat. {human_name}: {human_text}")
}
