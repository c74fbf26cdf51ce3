use std::io::{self, Write};

use chrono::Utc;
use tutr_app::AppConfig;
use tutr_core::{
    ChatSession, ChatTurn, DateRange, GenerationEvent, GenerationSession, GenerationState,
};
use tutr_db::{ChatWithEntries, Store};

use crate::{GenerateArgs, LastArg};

/// Stream a plan for the chats in the requested range to stdout. Ctrl-C
/// cancels the generation.
pub async fn run(
    config: &AppConfig,
    store: &mut Store,
    args: GenerateArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let range = date_range(&args)?;
    let (start_ms, end_ms) = range.bounds_ms();
    let chats = store.chats().chats_between(start_ms, end_ms)?;
    if chats.is_empty() {
        return Err(format!("no chats between {range}").into());
    }
    let sessions: Vec<ChatSession> = chats.into_iter().map(to_session).collect();
    tracing::info!(%range, chats = sessions.len(), "collected chat history");

    let selector = crate::backend::selector(config, args.mode.map(Into::into));
    let mut session = GenerationSession::new(selector).with_system_prompt(&config.system_prompt);
    session.start(sessions)?;

    while session.is_active() {
        tokio::select! {
            event = session.next_event() => {
                if let Some(GenerationEvent::Chunk { delta }) = event {
                    print!("{delta}");
                    io::stdout().flush()?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                session.cancel();
            }
        }
    }
    println!();

    match session.state() {
        GenerationState::Failed => {
            let error = session.error().unwrap_or("generation failed");
            return Err(error.to_string().into());
        }
        GenerationState::Cancelled => {
            eprintln!("cancelled; nothing saved");
            return Ok(());
        }
        _ => {}
    }

    if args.save
        && let Some(plan) = session.finished_plan()
    {
        let id = store.study_plans().create(&plan.title, &plan.content)?;
        eprintln!("saved plan {id}: {}", plan.title);
    }
    Ok(())
}

fn date_range(args: &GenerateArgs) -> tutr_core::Result<DateRange> {
    match (&args.from, &args.to) {
        (Some(from), Some(to)) => DateRange::parse(from, to),
        _ => {
            let preset = args.last.unwrap_or(LastArg::Week).into();
            Ok(DateRange::last(preset, Utc::now().date_naive()))
        }
    }
}

/// Stored chat → generation input. A negative swipe id can never be
/// selected, so it surfaces as an invalid turn when normalized.
fn to_session(chat: ChatWithEntries) -> ChatSession {
    let turns = chat
        .entries
        .into_iter()
        .map(|entry| ChatTurn {
            speaker_name: entry.speaker_name,
            alternatives: entry.swipes,
            selected: usize::try_from(entry.swipe_id).unwrap_or(usize::MAX),
        })
        .collect();
    ChatSession::new(chat.chat.name, turns)
}
