//! Free-roam verbs and the NPC interaction mode.
//!
//! While a session targets an NPC, its input is offered to the NPC's handler
//! instead of the verb table; `bye` always releases the target. Item matching
//! is first-match-wins over the relevant list in its stored order, with the
//! search term lowercased.

use super::{CommandResult, Engine};
use crate::broadcast::Audience;
use crate::error::StoreError;
use crate::message::{OutboundText, Style};
use crate::mux::{ConnId, InboundCommand};
use crate::npc::NpcReply;
use crate::world::NpcInstance;

impl Engine {
    /// Dispatches one command for a logged-in session.
    pub(super) async fn handle_interacting(&mut self, command: &InboundCommand) -> CommandResult {
        let conn = command.conn;
        let target = self.sessions.get(conn).and_then(|s| s.target.clone());
        if let Some(npc) = target {
            return self.handle_targeted(conn, command, npc).await;
        }

        match command.verb.as_str() {
            "quit" => {
                // The actual teardown (and the quit broadcast) happens when
                // the mux reports the disconnect.
                self.mux.disconnect(conn).await;
                return Ok(());
            }
            "help" => self.cmd_help(conn).await,
            "say" => self.cmd_say(conn, &command.arg).await,
            "color" => self.cmd_color(conn, &command.arg).await?,
            "drop" => self.cmd_drop(conn, &command.arg).await?,
            "take" => self.cmd_take(conn, &command.arg).await?,
            "inventory" => self.cmd_inventory(conn).await,
            "equip" => self.cmd_equip(conn, &command.arg).await?,
            "unequip" => self.cmd_unequip(conn, &command.arg).await?,
            "examine" => self.cmd_examine(conn, &command.arg).await,
            "look" => self.send_look(conn).await,
            "go" => self.cmd_go(conn, &command.arg).await?,
            "target" => self.cmd_target(conn, &command.arg).await,
            other => {
                self.unicast(conn, OutboundText::plain(format!("Unknown command '{}'", other)))
                    .await;
            }
        }
        self.send_prompt(conn).await;
        Ok(())
    }

    /// Routes a command to the targeted NPC's handler.
    async fn handle_targeted(
        &mut self,
        conn: ConnId,
        command: &InboundCommand,
        npc: NpcInstance,
    ) -> CommandResult {
        if command.verb == "bye" {
            if let Some(session) = self.sessions.get_mut(conn) {
                session.target = None;
            }
            self.send_prompt(conn).await;
            return Ok(());
        }

        let reply = match self.npcs.get(npc.code) {
            Some(handler) => {
                let store = self.store.clone();
                let Some(session) = self.sessions.get_mut(conn) else {
                    return Ok(());
                };
                handler
                    .handle(&command.verb, &command.arg, session, &npc, store.as_ref())
                    .await?
            }
            None => NpcReply::Unhandled,
        };

        match reply {
            NpcReply::Handled(lines) => {
                for line in lines {
                    self.unicast(conn, line).await;
                }
            }
            NpcReply::Unhandled => {
                self.unicast(
                    conn,
                    OutboundText::plain(format!("Unknown command '{}'", command.verb)),
                )
                .await;
            }
        }
        self.send_prompt(conn).await;
        Ok(())
    }

    async fn cmd_help(&self, conn: ConnId) {
        let lines = [
            "Commands:",
            "  say <message>          - Says something out loud, e.g. 'say Hello'",
            "  look                   - Examines the surroundings, e.g. 'look'",
            "  examine <item>         - Examines an item, e.g. 'examine fireplace'",
            "  inventory              - Lists your inventory",
            "  equip <item>           - Equip an item, e.g. 'equip sword'",
            "  unequip <weapon/armor> - Remove your currently equipped weapon or armor",
            "                           e.g. 'unequip weapon'",
            "  take <item>            - Take an item, e.g. 'take fireplace'",
            "  drop <item>            - Destroy an inventory item",
            "  go <exit>              - Moves through the exit specified, e.g. 'go outside'",
            "  color <on/off>         - Turns color on or off, e.g. 'color off'",
            "  quit                   - Disconnects from the game",
        ];
        for line in lines {
            self.unicast(conn, OutboundText::plain(line)).await;
        }
    }

    async fn cmd_say(&self, conn: ConnId, arg: &str) {
        let Some(session) = self.sessions.get(conn) else {
            return;
        };
        let (Some(name), Some(room)) = (session.name.clone(), session.room) else {
            return;
        };
        self.broadcast(
            Audience::Room(room),
            OutboundText::new()
                .style(Style::Bold)
                .style(Style::Blue)
                .text(format!("{} says: {}", name, arg)),
        )
        .await;
    }

    /// `color off` disables styling, anything else re-enables it. The
    /// durable attribute and the mux toggle only fire on an actual change.
    async fn cmd_color(&mut self, conn: ConnId, arg: &str) -> CommandResult {
        let Some(session) = self.sessions.get(conn) else {
            return Ok(());
        };
        let (Some(db_id), color) = (session.db_id, session.color) else {
            return Ok(());
        };
        let turning_off = arg.to_lowercase() == "off";
        if turning_off == color {
            let value = if turning_off { "False" } else { "True" };
            self.store.set_attribute(db_id, "color", value).await?;
            self.mux.toggle_color(conn).await;
            if let Some(session) = self.sessions.get_mut(conn) {
                session.color = !turning_off;
            }
        }
        Ok(())
    }

    async fn cmd_drop(&mut self, conn: ConnId, arg: &str) -> CommandResult {
        let wanted = arg.to_lowercase();
        let Some(session) = self.sessions.get(conn) else {
            return Ok(());
        };
        let Some(db_id) = session.db_id else {
            return Ok(());
        };
        let found = session
            .inventory
            .iter()
            .position(|item| item.name == wanted)
            .map(|pos| (pos, session.inventory[pos].clone()));

        match found {
            Some((_, item)) if item.invulnerable => {
                self.unicast(conn, OutboundText::plain(format!("You can't drop {}", item.name)))
                    .await;
            }
            Some((pos, item)) => {
                self.store.remove_inventory(db_id, item.id).await?;
                if let Some(session) = self.sessions.get_mut(conn) {
                    session.inventory.remove(pos);
                }
                self.unicast(
                    conn,
                    OutboundText::plain(format!(
                        "You dropped {} and it vanished in thin air!",
                        item.name
                    )),
                )
                .await;
            }
            None => {
                self.unicast(
                    conn,
                    OutboundText::plain(format!("You have no {} to drop", wanted)),
                )
                .await;
            }
        }
        Ok(())
    }

    async fn cmd_take(&mut self, conn: ConnId, arg: &str) -> CommandResult {
        let wanted = arg.to_lowercase();
        let Some(session) = self.sessions.get(conn) else {
            return Ok(());
        };
        let (Some(db_id), Some(room_id)) = (session.db_id, session.room) else {
            return Ok(());
        };
        let object = self
            .world
            .room(room_id)
            .and_then(|room| room.objects.iter().find(|obj| obj.name == wanted).cloned());

        let Some(object) = object else {
            self.unicast(conn, OutboundText::plain("take what?!")).await;
            return Ok(());
        };
        if !object.movable {
            self.unicast(conn, OutboundText::plain(object.fail_take)).await;
            return Ok(());
        }
        // Zero grants nothing; the take succeeds without touching inventory.
        if object.grants == 0 {
            self.unicast(conn, OutboundText::plain(object.take_success))
                .await;
            return Ok(());
        }
        // A unique item already carried blocks a second copy.
        let blocked = session
            .inventory
            .iter()
            .any(|item| item.id == object.grants && item.unique);
        if blocked {
            self.unicast(conn, OutboundText::plain(object.fail_take)).await;
            return Ok(());
        }

        let def = self
            .store
            .load_item_definition(object.grants)
            .await?
            .ok_or_else(|| StoreError::MissingRecord(format!("item {}", object.grants)))?;
        self.store.add_inventory(db_id, object.grants).await?;
        if let Some(session) = self.sessions.get_mut(conn) {
            session.inventory.push(def);
        }
        self.unicast(conn, OutboundText::plain(object.take_success))
            .await;
        Ok(())
    }

    async fn cmd_inventory(&self, conn: ConnId) {
        let Some(session) = self.sessions.get(conn) else {
            return;
        };
        let slot_line = |label: &str, item: &Option<crate::world::ItemDef>| {
            OutboundText::new()
                .style(Style::Green)
                .text(label)
                .style(Style::Reset)
                .text(
                    item.as_ref()
                        .map(|def| def.name.clone())
                        .unwrap_or_else(|| "None".to_string()),
                )
        };
        self.unicast(conn, slot_line("Your Weapon: ", &session.weapon))
            .await;
        self.unicast(conn, slot_line("Your Armor: ", &session.armor))
            .await;
        self.unicast(
            conn,
            OutboundText::new().style(Style::Green).text("Your Inventory:"),
        )
        .await;
        let items: Vec<String> = session
            .inventory
            .iter()
            .map(|item| format!(" - {}", item.name))
            .collect();
        for line in items {
            self.unicast(conn, OutboundText::plain(line)).await;
        }
    }

    async fn cmd_equip(&mut self, conn: ConnId, arg: &str) -> CommandResult {
        let wanted = arg.to_lowercase();
        let Some(session) = self.sessions.get(conn) else {
            return Ok(());
        };
        let Some(db_id) = session.db_id else {
            return Ok(());
        };
        let found = session
            .inventory
            .iter()
            .position(|item| item.name == wanted)
            .map(|pos| (pos, session.inventory[pos].clone()));

        let Some((pos, item)) = found else {
            self.unicast(conn, OutboundText::plain("equip what?!")).await;
            return Ok(());
        };

        let slot = if item.is_armor {
            "armor"
        } else if item.is_weapon {
            "weapon"
        } else {
            self.unicast(
                conn,
                OutboundText::plain("That item is not able to be equipped"),
            )
            .await;
            return Ok(());
        };

        let previous = if slot == "armor" {
            session.armor.clone()
        } else {
            session.weapon.clone()
        };

        // Swap durably first: the displaced item goes back to inventory
        // rows, the slot attribute points at the new item, and the new
        // item's row is consumed.
        if let Some(prev) = &previous {
            self.store.add_inventory(db_id, prev.id).await?;
        }
        self.store
            .set_attribute(db_id, slot, &item.id.to_string())
            .await?;
        self.store.remove_inventory(db_id, item.id).await?;

        if let Some(session) = self.sessions.get_mut(conn) {
            if let Some(prev) = previous {
                session.inventory.push(prev);
            }
            if slot == "armor" {
                session.armor = Some(item.clone());
            } else {
                session.weapon = Some(item.clone());
            }
            session.inventory.remove(pos);
        }
        self.unicast(
            conn,
            OutboundText::plain(format!("You equip your {}", item.name)),
        )
        .await;
        Ok(())
    }

    async fn cmd_unequip(&mut self, conn: ConnId, arg: &str) -> CommandResult {
        let Some(session) = self.sessions.get(conn) else {
            return Ok(());
        };
        let Some(db_id) = session.db_id else {
            return Ok(());
        };
        let (slot, equipped, empty_line) = match arg.to_lowercase().as_str() {
            "armor" => ("armor", session.armor.clone(), "You're not wearing any armor!"),
            "weapon" => (
                "weapon",
                session.weapon.clone(),
                "You're not wielding a weapon!",
            ),
            _ => {
                self.unicast(
                    conn,
                    OutboundText::plain("Parameter must be either 'weapon' or 'armor'"),
                )
                .await;
                return Ok(());
            }
        };

        let Some(item) = equipped else {
            self.unicast(conn, OutboundText::new().style(Style::Red).text(empty_line))
                .await;
            return Ok(());
        };

        self.store.add_inventory(db_id, item.id).await?;
        self.store.set_attribute(db_id, slot, "0").await?;
        if let Some(session) = self.sessions.get_mut(conn) {
            if slot == "armor" {
                session.armor = None;
            } else {
                session.weapon = None;
            }
            session.inventory.push(item.clone());
        }
        self.unicast(
            conn,
            OutboundText::plain(format!("You remove your {}", item.name)),
        )
        .await;
        Ok(())
    }

    /// Examines room objects, then carried items, then NPCs.
    async fn cmd_examine(&self, conn: ConnId, arg: &str) {
        let wanted = arg.to_lowercase();
        let Some(session) = self.sessions.get(conn) else {
            return;
        };
        let room = session.room.and_then(|id| self.world.room(id));

        let description = room
            .and_then(|rm| rm.objects.iter().find(|obj| obj.name == wanted))
            .map(|obj| obj.description.clone())
            .or_else(|| {
                session
                    .inventory
                    .iter()
                    .find(|item| item.name == wanted)
                    .map(|item| item.description.clone())
            })
            .or_else(|| {
                room.and_then(|rm| rm.npcs.iter().find(|npc| npc.name == wanted))
                    .map(|npc| npc.description.clone())
            });

        match description {
            Some(text) => self.unicast(conn, OutboundText::plain(text)).await,
            None => self.unicast(conn, OutboundText::plain("examine what?!")).await,
        }
    }

    async fn cmd_go(&mut self, conn: ConnId, arg: &str) -> CommandResult {
        let wanted = arg.to_lowercase();
        let Some(session) = self.sessions.get(conn) else {
            return Ok(());
        };
        let (Some(db_id), Some(name), Some(room_id)) =
            (session.db_id, session.name.clone(), session.room)
        else {
            return Ok(());
        };
        let exit = self.world.room(room_id).and_then(|room| {
            room.exits
                .iter()
                .find(|ex| ex.name.to_lowercase() == wanted)
                .cloned()
        });

        let Some(exit) = exit else {
            self.unicast(
                conn,
                OutboundText::plain(format!("Unknown exit '{}'", wanted)),
            )
            .await;
            return Ok(());
        };

        let has_key = exit.item_key == 0
            || session.inventory.iter().any(|item| item.id == exit.item_key);
        if !has_key {
            self.unicast(conn, OutboundText::plain(exit.fail_key)).await;
            return Ok(());
        }

        let Some(dest) = self.world.resolve_destination(exit.to_room) else {
            self.unicast(conn, OutboundText::plain("The way is barred.")).await;
            return Ok(());
        };

        self.store.update_last_room(db_id, dest).await?;
        self.broadcast(
            Audience::RoomExcept(room_id, conn),
            OutboundText::new()
                .style(Style::Bold)
                .style(Style::Yellow)
                .text(format!("{} left via exit '{}'", name, exit.name)),
        )
        .await;
        if let Some(session) = self.sessions.get_mut(conn) {
            session.room = Some(dest);
        }
        self.broadcast(
            Audience::RoomExcept(dest, conn),
            OutboundText::new()
                .style(Style::Bold)
                .style(Style::Yellow)
                .text(format!("{} arrived via exit '{}'", name, exit.name)),
        )
        .await;
        let dest_name = self
            .world
            .room(dest)
            .map(|room| room.name.clone())
            .unwrap_or_default();
        self.unicast(
            conn,
            OutboundText::plain(format!("You arrive at '{}'", dest_name)),
        )
        .await;
        Ok(())
    }

    async fn cmd_target(&mut self, conn: ConnId, arg: &str) {
        let wanted = arg.to_lowercase();
        let Some(session) = self.sessions.get(conn) else {
            return;
        };
        let npc = session.room.and_then(|room_id| {
            self.world
                .room(room_id)
                .and_then(|room| room.npcs.iter().find(|npc| npc.name == wanted).cloned())
        });

        match npc {
            Some(npc) => {
                let line = OutboundText::new()
                    .text("Now targeting ")
                    .style(Style::Bold)
                    .text(npc.name.clone())
                    .style(Style::Reset)
                    .text(" enter 'bye' to stop targeting.");
                if let Some(session) = self.sessions.get_mut(conn) {
                    session.target = Some(npc);
                }
                self.unicast(conn, line).await;
            }
            None => self.unicast(conn, OutboundText::plain("I see no such NPC")).await,
        }
    }
}
