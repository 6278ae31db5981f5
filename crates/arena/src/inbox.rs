//! Player command inbox.
//!
//! Producers hold a cloneable [`CommandSender`]; the game drains the
//! [`Inbox`] once per tick without blocking.

use crate::error::InboxClosed;
use glam::Vec2;
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};

/// A request from outside the simulation.
#[derive(Debug)]
pub enum Command {
    /// Steer a player's cells toward a world point.
    SetTarget { player_id: u32, target: Vec2 },
    Split { player_id: u32 },
    Eject { player_id: u32 },
    /// Spawn a dead player again.
    Respawn { player_id: u32 },
    /// Register and spawn a new player; the reply carries its ID.
    Join { name: String, reply: oneshot::Sender<u32> },
    Disconnect { player_id: u32 },
}

/// Cloneable handle for queueing commands.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<Command>,
}

impl CommandSender {
    pub fn send(&self, command: Command) -> Result<(), InboxClosed> {
        self.tx.send(command).map_err(|_| InboxClosed)
    }

    pub fn set_target(&self, player_id: u32, target: Vec2) -> Result<(), InboxClosed> {
        self.send(Command::SetTarget { player_id, target })
    }

    pub fn split(&self, player_id: u32) -> Result<(), InboxClosed> {
        self.send(Command::Split { player_id })
    }

    pub fn eject(&self, player_id: u32) -> Result<(), InboxClosed> {
        self.send(Command::Eject { player_id })
    }

    pub fn respawn(&self, player_id: u32) -> Result<(), InboxClosed> {
        self.send(Command::Respawn { player_id })
    }

    pub fn disconnect(&self, player_id: u32) -> Result<(), InboxClosed> {
        self.send(Command::Disconnect { player_id })
    }

    /// Join the game and wait for the tick that admits the player.
    pub async fn join(&self, name: impl Into<String>) -> Result<u32, InboxClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Join {
            name: name.into(),
            reply,
        })?;
        rx.await.map_err(|_| InboxClosed)
    }
}

/// A queued command other than steering.
#[derive(Debug)]
pub enum Action {
    Split { player_id: u32 },
    Eject { player_id: u32 },
    Respawn { player_id: u32 },
    Join { name: String, reply: oneshot::Sender<u32> },
    Disconnect { player_id: u32 },
}

/// Commands collected since the previous drain.
#[derive(Debug, Default)]
pub struct Drained {
    /// Latest target per player, in order of first appearance.
    pub targets: Vec<(u32, Vec2)>,
    /// Every other command, in arrival order.
    pub actions: Vec<Action>,
}

/// Receiving end of the command channel.
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<Command>,
    tx: mpsc::UnboundedSender<Command>,
}

impl Inbox {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { rx, tx }
    }

    pub fn sender(&self) -> CommandSender {
        CommandSender { tx: self.tx.clone() }
    }

    /// Take every queued command without waiting.
    pub fn drain(&mut self) -> Drained {
        let mut drained = Drained::default();
        let mut target_slots: HashMap<u32, usize> = HashMap::new();

        while let Ok(command) = self.rx.try_recv() {
            let action = match command {
                Command::SetTarget { player_id, target } => {
                    match target_slots.get(&player_id) {
                        Some(&slot) => drained.targets[slot].1 = target,
                        None => {
                            target_slots.insert(player_id, drained.targets.len());
                            drained.targets.push((player_id, target));
                        }
                    }
                    continue;
                }
                Command::Split { player_id } => Action::Split { player_id },
                Command::Eject { player_id } => Action::Eject { player_id },
                Command::Respawn { player_id } => Action::Respawn { player_id },
                Command::Join { name, reply } => Action::Join { name, reply },
                Command::Disconnect { player_id } => Action::Disconnect { player_id },
            };
            drained.actions.push(action);
        }
        drained
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_target_wins() {
        let mut inbox = Inbox::new();
        let sender = inbox.sender();
        sender.set_target(1, Vec2::new(1.0, 1.0)).unwrap();
        sender.set_target(2, Vec2::new(5.0, 5.0)).unwrap();
        sender.set_target(1, Vec2::new(9.0, 9.0)).unwrap();

        let drained = inbox.drain();
        assert_eq!(drained.targets, vec![(1, Vec2::new(9.0, 9.0)), (2, Vec2::new(5.0, 5.0))]);
        assert!(drained.actions.is_empty());
    }

    #[test]
    fn test_actions_keep_order() {
        let mut inbox = Inbox::new();
        let sender = inbox.sender();
        sender.split(1).unwrap();
        sender.set_target(1, Vec2::ONE).unwrap();
        sender.eject(1).unwrap();
        sender.split(1).unwrap();

        let drained = inbox.drain();
        assert!(matches!(
            drained.actions.as_slice(),
            [Action::Split { player_id: 1 }, Action::Eject { player_id: 1 }, Action::Split { player_id: 1 }]
        ));
        assert!(inbox.drain().actions.is_empty());
    }

    #[test]
    fn test_send_after_drop_fails() {
        let inbox = Inbox::new();
        let sender = inbox.sender();
        drop(inbox);
        assert_eq!(sender.split(1), Err(InboxClosed));
    }
}
