//! Login flow: naming, then authentication, then entry into the world.
//!
//! Plaintext passwords exist only as locals inside
//! [`Engine::handle_authenticating`]; nothing stores them on the session or
//! anywhere else, and they are gone when the handler returns.

use super::{CommandResult, Engine};
use crate::broadcast::Audience;
use crate::message::{OutboundText, Style};
use crate::mux::InboundCommand;
use crate::world::ItemDef;
use tracing::info;

/// First whitespace-delimited token, case preserved. Names and passwords are
/// single tokens.
fn first_token(line: &str) -> &str {
    line.split_whitespace().next().unwrap_or("")
}

impl Engine {
    /// Handles input while the session is choosing a name.
    pub(super) async fn handle_naming(&mut self, command: &InboundCommand) -> CommandResult {
        let conn = command.conn;
        let token = first_token(&command.line).to_string();
        if token.is_empty() {
            return Ok(());
        }

        let new_player = self
            .sessions
            .get(conn)
            .map(|session| session.new_player)
            .unwrap_or(false);

        // Once a new player is being named, "new" is just another (rejected)
        // name attempt.
        if !new_player && token.eq_ignore_ascii_case("new") {
            if let Some(session) = self.sessions.get_mut(conn) {
                session.new_player = true;
            }
            self.unicast(
                conn,
                OutboundText::plain("What would you like your name to be?"),
            )
            .await;
            return Ok(());
        }

        if new_player {
            if self.acceptable_new_name(&token).await? {
                if let Some(session) = self.sessions.get_mut(conn) {
                    session.claimed_name = Some(token);
                }
                self.unicast(conn, OutboundText::plain("Choose a password?"))
                    .await;
            } else {
                self.unicast(
                    conn,
                    OutboundText::new()
                        .style(Style::Red)
                        .text("Sorry, that name is in use or inappropriate, try again."),
                )
                .await;
            }
        } else {
            // Existing players are validated against the store at the
            // password step; any token is accepted as a claim here.
            if let Some(session) = self.sessions.get_mut(conn) {
                session.claimed_name = Some(token);
            }
            self.unicast(conn, OutboundText::plain("What is your password? "))
                .await;
        }
        Ok(())
    }

    /// Handles the password step and, on success, enters the world.
    pub(super) async fn handle_authenticating(&mut self, command: &InboundCommand) -> CommandResult {
        let conn = command.conn;
        let password = first_token(&command.line);
        if password.is_empty() {
            return Ok(());
        }

        let (claimed, new_player) = match self.sessions.get(conn) {
            Some(session) => match session.claimed_name.clone() {
                Some(claimed) => (claimed, session.new_player),
                None => return Ok(()),
            },
            None => return Ok(()),
        };

        if new_player && password.len() < self.config.min_password_len {
            self.unicast(
                conn,
                OutboundText::new().style(Style::Red).text("Password too short!"),
            )
            .await;
            self.unicast(conn, OutboundText::plain("Choose a password?"))
                .await;
            return Ok(());
        }

        // First writer wins: if someone is already playing under this name,
        // the later session is dropped without any broadcast.
        if self.sessions.conn_for_live_name(&claimed).is_some() {
            info!("⛔ Connection {} lost the name race for '{}'", conn, claimed);
            self.sessions.remove(conn);
            self.mux.disconnect(conn).await;
            return Ok(());
        }

        if new_player {
            // The name was free at the prompt, but someone else may have
            // created it while the password was typed.
            if self.store.name_taken(&claimed).await? {
                info!("⛔ Name '{}' was created while connection {} typed a password", claimed, conn);
                if let Some(session) = self.sessions.get_mut(conn) {
                    session.claimed_name = None;
                }
                self.unicast(
                    conn,
                    OutboundText::new()
                        .style(Style::Red)
                        .text("Sorry, that name is in use or inappropriate, try again."),
                )
                .await;
                self.unicast(
                    conn,
                    OutboundText::plain("What would you like your name to be?"),
                )
                .await;
                return Ok(());
            }
            let hash = self.hasher.hash(password);
            let db_id = self
                .store
                .create_player(&claimed, &hash, self.config.starting_room)
                .await?;
            self.mux.set_authenticated(conn).await;
            if let Some(session) = self.sessions.get_mut(conn) {
                session.db_id = Some(db_id);
                session.name = Some(claimed.clone());
                session.room = Some(self.config.starting_room);
                session.health = 100;
                session.gold = 0;
            }
            info!("🆕 Player '{}' created (id {})", claimed, db_id);
        } else {
            let record = self.store.find_player_by_name(&claimed).await?;
            let authenticated = record
                .as_ref()
                .map(|rec| self.hasher.verify(password, &rec.password_hash))
                .unwrap_or(false);
            let Some(record) = record.filter(|_| authenticated) else {
                info!("⛔ Failed login for '{}' on connection {}", claimed, conn);
                self.sessions.remove(conn);
                self.mux.disconnect(conn).await;
                return Ok(());
            };

            let hydrated = self.hydrate_player(&record).await?;
            let room = self
                .world
                .resolve_destination(record.last_room)
                .unwrap_or_else(|| self.world.first_room());

            if !hydrated.color {
                self.mux.toggle_color(conn).await;
            }
            self.mux.set_authenticated(conn).await;
            if let Some(session) = self.sessions.get_mut(conn) {
                session.db_id = Some(record.id);
                session.name = Some(claimed.clone());
                session.room = Some(room);
                session.health = hydrated.health;
                session.gold = hydrated.gold;
                session.color = hydrated.color;
                session.armor = hydrated.armor;
                session.weapon = hydrated.weapon;
                session.inventory = hydrated.inventory;
            }
            info!("🔓 Player '{}' logged in (id {})", claimed, record.id);
        }

        self.broadcast(
            Audience::Global,
            OutboundText::new()
                .style(Style::Bold)
                .style(Style::Yellow)
                .text(format!("{} entered the game", claimed)),
        )
        .await;
        self.unicast(
            conn,
            OutboundText::new().style(Style::Magenta).text(format!(
                "Welcome to the game, {}. Type 'help' for a list of commands. Have fun!\r\n",
                claimed
            )),
        )
        .await;
        self.send_look(conn).await;
        self.send_prompt(conn).await;
        Ok(())
    }

    /// A new-player name must not be "new", must be at least two characters
    /// of alphanumerics (plus any configured punctuation), and must not be
    /// taken in the store.
    async fn acceptable_new_name(&self, name: &str) -> Result<bool, crate::error::StoreError> {
        if name.eq_ignore_ascii_case("new") || name.chars().count() < 2 {
            return Ok(false);
        }
        let allowed = |c: char| c.is_alphanumeric() || self.config.name_punctuation.contains(c);
        if !name.chars().all(allowed) {
            return Ok(false);
        }
        Ok(!self.store.name_taken(name).await?)
    }

    /// Loads an existing player's durable state from the attribute bag and
    /// inventory rows.
    async fn hydrate_player(
        &self,
        record: &crate::store::PlayerRecord,
    ) -> Result<HydratedPlayer, crate::error::StoreError> {
        let id = record.id;
        let health = self
            .store
            .get_attribute(id, "health", "100")
            .await?
            .parse()
            .unwrap_or(100);
        let gold = self
            .store
            .get_attribute(id, "gold", "0")
            .await?
            .parse()
            .unwrap_or(0);
        let color = self.store.get_attribute(id, "color", "True").await? == "True";

        let armor = self.load_equipped(id, "armor").await?;
        let weapon = self.load_equipped(id, "weapon").await?;

        let mut inventory = Vec::new();
        for item_id in self.store.list_inventory(id).await? {
            if let Some(def) = self.store.load_item_definition(item_id).await? {
                inventory.push(def);
            }
        }

        Ok(HydratedPlayer {
            health,
            gold,
            color,
            armor,
            weapon,
            inventory,
        })
    }

    /// Reads an equipment slot attribute (an item id, 0 when empty) and
    /// loads its template.
    async fn load_equipped(
        &self,
        player: crate::store::PlayerDbId,
        slot: &str,
    ) -> Result<Option<ItemDef>, crate::error::StoreError> {
        let raw = self.store.get_attribute(player, slot, "0").await?;
        let item_id: u32 = raw.parse().unwrap_or(0);
        if item_id == 0 {
            return Ok(None);
        }
        self.store.load_item_definition(item_id).await
    }
}

/// Durable state gathered before the session is mutated.
struct HydratedPlayer {
    health: i32,
    gold: i64,
    color: bool,
    armor: Option<ItemDef>,
    weapon: Option<ItemDef>,
    inventory: Vec<ItemDef>,
}
