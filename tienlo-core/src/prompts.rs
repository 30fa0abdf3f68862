//! Outbound prompt templates.
//!
//! Templates are plain format strings with substitution points; their
//! literary content is deliberately minimal and callers may replace the
//! system prompt wholesale through
//! [`StorytellerConfig`](crate::storyteller::StorytellerConfig).

use crate::context::ContextWindows;
use crate::player::PlayerState;
use crate::world::WorldState;

/// Default storyteller system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "Bạn là người kể chuyện của Tiên Lộ Ký, \
một thế giới tu tiên. Kể tiếp câu chuyện bằng tiếng Việt, ngôi thứ hai. \
Mọi thay đổi trạng thái phải được phát ra dưới dạng thẻ \
[TAG_NAME: key=\"value\", ...] xen giữa lời kể. Mỗi lượt bắt buộc phát \
[STATS_UPDATE: turn=+1].";

/// Render the player sheet for the prompt.
fn player_block(player: &PlayerState) -> String {
    let realm = player.realm_state();
    format!(
        "Tên: {}\nCảnh giới: {}\nSinh lực: {}/{}\nLinh lực: {}/{}\n\
         Công: {} | Thủ: {}\nKinh nghiệm: {} | Linh thạch: {}\n\
         Tuổi thọ còn lại: {} năm | Lượt: {}",
        player.name,
        realm.display_name,
        player.hp,
        player.max_hp,
        player.mana,
        player.max_mana,
        player.atk,
        player.def,
        player.exp,
        player.currency,
        player.lifespan,
        player.turn,
    )
}

/// Render the scenario preamble from the world's starting factors.
fn scenario_block(world: &WorldState) -> String {
    let factors = &world.starting_factors;
    if factors.scenario.is_empty() && factors.background.is_empty() {
        return String::new();
    }
    format!(
        "## Bối Cảnh\n{}\n{}\n\n",
        factors.scenario, factors.background
    )
}

/// Build the full user-turn prompt: scenario, player sheet, the four memory
/// windows, then the player's action.
pub fn build_turn_prompt(
    player: &PlayerState,
    world: &WorldState,
    windows: &ContextWindows,
    input: &str,
) -> String {
    format!(
        "{}## Nhân Vật\n{}\n\n{}\n\n## Hành Động Của Người Chơi\n{}",
        scenario_block(world),
        player_block(player),
        windows.to_prompt_block(),
        input,
    )
}
