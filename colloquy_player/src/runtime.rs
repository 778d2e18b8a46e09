use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::rc::Rc;

use anyhow::{Context, Result};
use colloquy_playback::{PlaybackOptions, PlaybackSession};
use colloquy_script::Conversation;
use serde::Serialize;

use crate::cli::PlayArgs;

#[derive(Debug, Serialize)]
pub struct PlaybackEvent {
    pub sequence: u32,
    pub frame: u32,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub topic: String,
    pub frames: u32,
    pub elapsed_seconds: f32,
    /// Playback ran to the end of the topic within the time limit.
    pub completed: bool,
    pub events: Vec<PlaybackEvent>,
    pub variables: BTreeMap<String, i32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub info: Vec<String>,
}

/// Stepping parameters for [`run_playback`].
#[derive(Debug, Clone)]
pub struct RunLimits {
    pub frame_rate: u32,
    pub max_seconds: f32,
    pub fast_forward: bool,
    pub choices: Vec<usize>,
}

pub fn execute(args: PlayArgs) -> Result<()> {
    let conversation = Conversation::from_json_file(&args.conversation)
        .with_context(|| format!("loading conversation {}", args.conversation.display()))?;

    let mut options = match args.options.as_ref() {
        Some(path) => PlaybackOptions::from_json_file(path)
            .with_context(|| format!("loading playback options {}", path.display()))?,
        None => PlaybackOptions::default(),
    };
    if args.no_auto_advance {
        options.auto_advance_commands = false;
    }

    let topic = conversation
        .find_topic(args.file.as_deref(), &args.topic)
        .with_context(|| match args.file.as_deref() {
            Some(file) => format!("topic {file}/{} not found", args.topic),
            None => format!("topic {} not found", args.topic),
        })?;
    let topic_name = conversation
        .topic(topic)
        .map(|found| found.display_name())
        .unwrap_or_else(|| args.topic.clone());

    let mut session = PlaybackSession::with_scripted_executor(Rc::new(conversation), options);
    session.set_topic(Some(topic));
    session.set_running(true);

    let limits = RunLimits {
        frame_rate: args.frame_rate,
        max_seconds: args.max_seconds,
        fast_forward: args.fast_forward,
        choices: args.choices.clone(),
    };
    let summary = run_playback(&mut session, topic_name, &limits);

    if args.verbose {
        for event in &summary.events {
            println!("[{:>5}] {}", event.frame, event.label);
        }
    }
    for line in &summary.info {
        println!("info: {line}");
    }
    let status = if summary.completed {
        ""
    } else if session.running() {
        " (time limit reached)"
    } else {
        " (stopped early)"
    };
    println!(
        "Played {} in {} frames ({:.2}s), {} events{}",
        summary.topic,
        summary.frames,
        summary.elapsed_seconds,
        summary.events.len(),
        status
    );
    if session.running() {
        eprintln!(
            "[colloquy_player] warning: playback still running after {}s",
            args.max_seconds
        );
    } else if !summary.completed {
        eprintln!("[colloquy_player] warning: playback stopped before the end of the topic");
    }

    if let Some(path) = args.event_log_json.as_ref() {
        let json = serde_json::to_string_pretty(&summary)
            .context("serializing playback event log to JSON")?;
        fs::write(path, &json)
            .with_context(|| format!("writing playback event log to {}", path.display()))?;
        println!("Saved playback event log to {}", path.display());
    }

    Ok(())
}

/// Steps `session` at a fixed frame rate until it stops running or the time
/// limit is hit. Player choices are answered from `limits.choices` in order,
/// falling back to the first offered option; held commands are acknowledged
/// on the frame after they show up.
pub fn run_playback(session: &mut PlaybackSession, topic: String, limits: &RunLimits) -> RunSummary {
    let step = 1.0 / limits.frame_rate as f32;
    let max_frames = (limits.max_seconds * limits.frame_rate as f32).ceil() as u32;
    let mut choices: VecDeque<usize> = limits.choices.iter().copied().collect();
    let mut events = Vec::new();
    let mut info = Vec::new();
    let mut frame = 0;
    let mut reached_end = false;

    while session.running() && frame < max_frames {
        frame += 1;
        session.update(step);
        if limits.fast_forward {
            session.fast_forward_speaking();
        }

        if session.choice_box().is_active() {
            let offered = session.choice_box().entries().len();
            let wanted = choices.pop_front().unwrap_or(0);
            let pick = if wanted < offered {
                wanted
            } else {
                log::warn!("choice {wanted} not offered ({offered} options), picking 0");
                0
            };
            session.select_choice(pick);
        }

        if let Some(text) = session.take_info_text() {
            log::info!("{text}");
            info.push(text);
            if session.running() && !session.auto_advance_commands() {
                session.advance_to_next_action();
            }
        }

        for label in session.take_events() {
            reached_end |= label == "playback.end";
            let sequence = events.len() as u32;
            events.push(PlaybackEvent {
                sequence,
                frame,
                label,
            });
        }
    }

    RunSummary {
        topic,
        frames: frame,
        elapsed_seconds: frame as f32 * step,
        // Error stops such as an unknown speaker never log the end marker.
        completed: reached_end && !session.running(),
        events,
        variables: session.world().variables.clone(),
        info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(document: &str, topic: &str) -> PlaybackSession {
        let conversation = Conversation::from_json_str(document).unwrap();
        let topic = conversation.find_topic(None, topic).unwrap();
        let mut session =
            PlaybackSession::with_scripted_executor(Rc::new(conversation), PlaybackOptions::default());
        session.set_topic(Some(topic));
        session.set_running(true);
        session
    }

    fn limits(choices: Vec<usize>) -> RunLimits {
        RunLimits {
            frame_rate: 10,
            max_seconds: 10.0,
            fast_forward: false,
            choices,
        }
    }

    const CHOICE: &str = r#"{
        "files": [{ "id": "bar", "topics": [{ "id": "order", "actions": [
            { "type": "player_choice", "variable": "drink", "options": [
                { "text": "Coffee" },
                { "text": "Tea", "actions": [{ "type": "set_variable", "name": "tea", "value": 1 }] }
            ]}
        ]}]}]
    }"#;

    #[test]
    fn scripted_choices_are_applied_in_order() {
        let mut session = session(CHOICE, "order");
        let summary = run_playback(&mut session, "bar/order".to_string(), &limits(vec![1]));
        assert!(summary.completed);
        assert_eq!(summary.variables.get("drink"), Some(&1));
        assert_eq!(summary.variables.get("tea"), Some(&1));
        assert!(summary
            .events
            .iter()
            .any(|event| event.label == "choice.select 1"));
    }

    #[test]
    fn out_of_range_choice_falls_back_to_first() {
        let mut session = session(CHOICE, "order");
        let summary = run_playback(&mut session, "bar/order".to_string(), &limits(vec![7]));
        assert!(summary.completed);
        assert_eq!(summary.variables.get("drink"), Some(&0));
    }

    #[test]
    fn held_commands_are_acknowledged() {
        let mut session = session(
            r#"{ "files": [{ "id": "bar", "topics": [{ "id": "order", "actions": [
                { "type": "game_command", "command": "pour" },
                { "type": "set_variable", "name": "served", "value": 1 }
            ]}]}]}"#,
            "order",
        );
        session.set_auto_advance_commands(false);
        let summary = run_playback(&mut session, "bar/order".to_string(), &limits(Vec::new()));
        assert!(summary.completed);
        assert_eq!(summary.info, vec!["Game Command: pour".to_string()]);
        assert_eq!(summary.variables.get("served"), Some(&1));
    }

    #[test]
    fn time_limit_stops_endless_loops() {
        let mut session = session(
            r#"{ "files": [{ "id": "bar", "topics": [{ "id": "order", "actions": [
                { "type": "wait", "condition": { "type": "logic", "operator": "none" },
                  "actions": [{ "type": "comment" }] }
            ]}]}]}"#,
            "order",
        );
        let summary = run_playback(&mut session, "bar/order".to_string(), &limits(Vec::new()));
        assert!(!summary.completed);
        assert_eq!(summary.frames, 100);
        let sequences: Vec<u32> = summary.events.iter().map(|event| event.sequence).collect();
        assert!(sequences.windows(2).all(|pair| pair[1] == pair[0] + 1));
    }

    #[test]
    fn error_stop_is_not_completion() {
        let mut session = session(
            r#"{ "files": [{ "id": "bar", "topics": [{ "id": "order", "actions": [
                { "type": "actor_speak", "actor": "bogen", "min_speech_time": 1.0 },
                { "type": "set_variable", "name": "served", "value": 1 }
            ]}]}]}"#,
            "order",
        );
        let summary = run_playback(&mut session, "bar/order".to_string(), &limits(Vec::new()));
        assert!(!session.running());
        assert!(!summary.completed);
        assert_eq!(summary.frames, 1);
        assert_eq!(summary.info, vec!["No actor with ID 'bogen' exists.".to_string()]);
        assert!(summary.events.iter().all(|event| event.label != "playback.end"));
        assert_eq!(summary.variables.get("served"), None);
    }
}
