//! The scrapbot: buys unwanted items for a tenth of their base value.

use super::{NpcHandler, NpcReply};
use crate::error::StoreError;
use crate::message::OutboundText;
use crate::session::Session;
use crate::store::PlayerStore;
use crate::world::NpcInstance;
use async_trait::async_trait;
use tracing::info;

/// Interaction code the scrapbot is registered under.
pub const CODE: u32 = 1;

pub struct Scrapbot;

/// Payout for an item: 10% of base value, truncated.
fn valuation(base_value: i32) -> i64 {
    (f64::from(base_value) * 0.10) as i64
}

#[async_trait]
impl NpcHandler for Scrapbot {
    async fn handle(
        &self,
        verb: &str,
        arg: &str,
        session: &mut Session,
        _npc: &NpcInstance,
        store: &dyn PlayerStore,
    ) -> Result<NpcReply, StoreError> {
        match verb {
            "help" => Ok(NpcReply::Handled(vec![
                OutboundText::plain("I am a scrapbot, I turn unwanted items into gold!").text("\r\n"),
                OutboundText::plain("I answer to the following commands:"),
                OutboundText::plain("  appraise <item> - tell you how much <item> is worth."),
                OutboundText::plain("                    eg: 'appraise sword'"),
                OutboundText::plain("  scrap <item>    - make the exchange. THIS CAN NOT BE UNDONE! "),
                OutboundText::plain("                    eg: 'scrap sword'"),
                OutboundText::plain("  bye             - leave me in peace."),
            ])),

            "appraise" => {
                let wanted = arg.to_lowercase();
                let found = session.inventory.iter().find(|item| item.name == wanted);
                let line = match found {
                    Some(item) if item.base_value > 0 => OutboundText::plain(format!(
                        "That {} looks like it's worth {} gold",
                        item.name,
                        valuation(item.base_value)
                    )),
                    Some(_) => OutboundText::plain("That item has no value!"),
                    None => OutboundText::plain("appraise what?"),
                };
                Ok(NpcReply::Handled(vec![line]))
            }

            "scrap" => {
                let wanted = arg.to_lowercase();
                let Some(pos) = session.inventory.iter().position(|item| item.name == wanted)
                else {
                    return Ok(NpcReply::Handled(vec![OutboundText::plain("scrap what?")]));
                };
                if session.inventory[pos].base_value <= 0 {
                    return Ok(NpcReply::Handled(vec![OutboundText::plain(
                        "That item has no value!",
                    )]));
                }
                let item_id = session.inventory[pos].id;
                let item_name = session.inventory[pos].name.clone();
                let val = valuation(session.inventory[pos].base_value);
                let new_gold = session.gold + val;

                // Durable writes land before the in-memory copy changes.
                let player = session
                    .db_id
                    .ok_or_else(|| StoreError::MissingRecord("session has no player id".into()))?;
                store.remove_inventory(player, item_id).await?;
                store.set_attribute(player, "gold", &new_gold.to_string()).await?;

                session.gold = new_gold;
                session.inventory.remove(pos);
                info!("💰 Scrapbot paid {} gold for '{}'", val, item_name);

                Ok(NpcReply::Handled(vec![OutboundText::plain(format!(
                    "Here's {} gold for your {}",
                    val, item_name
                ))]))
            }

            _ => Ok(NpcReply::Unhandled),
        }
    }
}
