//! Command dispatch, shared by the socket and `POST /game_command`.
//!
//! Identity and membership are resolved before anything here runs.

use crate::error::GameResult;
use crate::protocol::{CardPayload, CommandReply, GameCommand, StoryPayload};
use crate::state::Room;

pub async fn handle_command(
    room: &Room,
    player_id: &str,
    command: GameCommand,
) -> GameResult<CommandReply> {
    match command {
        GameCommand::SubmitStory(StoryPayload { story, card_id }) => {
            room.submit_story(player_id, story.clone(), card_id).await?;
            Ok(CommandReply::Story(StoryPayload {
                story: story.trim().to_string(),
                card_id,
            }))
        }

        GameCommand::SubmitCard(CardPayload { card_id }) => {
            room.submit_card(player_id, card_id).await?;
            Ok(CommandReply::Submitted {
                submitted_card: card_id,
            })
        }

        GameCommand::Vote(CardPayload { card_id }) => {
            room.vote(player_id, card_id).await?;
            Ok(CommandReply::Voted(CardPayload { card_id }))
        }

        GameCommand::Ready => {
            room.set_ready(player_id).await?;
            Ok(CommandReply::Ack {})
        }

        GameCommand::Start => {
            room.start(player_id).await?;
            Ok(CommandReply::Ack {})
        }

        GameCommand::FetchHistory => Ok(CommandReply::History {
            turns: room.history().await,
        }),
    }
}
