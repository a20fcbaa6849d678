//! Minimum-cost alignment of the previous message list against the new one.
//!
//! Remote messages can be edited in place or deleted, but a sent message always lands
//! after every existing one. An alignment therefore walks two tracks: on track `A` every
//! new message so far is an edit (or keep) of an old one; on track `B` at least one new
//! message has been sent, and from then on new messages can only be sent. Deletes are
//! allowed on both tracks.

use crate::message::MessageSpec;

const SEND_FACTOR: f64 = 2.0;
const EDIT_FACTOR: f64 = 1.5;
const DELETE_COST: f64 = 0.5;
const FORCED_UPDATE_COST: f64 = 1.0;

#[derive(Clone, Debug, PartialEq)]
pub enum ScreenAction {
    Keep { old: MessageSpec, new: MessageSpec },
    Update { old: MessageSpec, new: MessageSpec },
    Delete { old: MessageSpec },
    Send { new: MessageSpec },
}

impl ScreenAction {
    pub fn old(&self) -> Option<&MessageSpec> {
        match self {
            ScreenAction::Keep { old, .. }
            | ScreenAction::Update { old, .. }
            | ScreenAction::Delete { old } => Some(old),
            ScreenAction::Send { .. } => None,
        }
    }

    pub fn new_spec(&self) -> Option<&MessageSpec> {
        match self {
            ScreenAction::Keep { new, .. }
            | ScreenAction::Update { new, .. }
            | ScreenAction::Send { new } => Some(new),
            ScreenAction::Delete { .. } => None,
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, ScreenAction::Keep { .. })
    }
}

pub fn send_cost(message: &MessageSpec) -> f64 {
    SEND_FACTOR * f64::from(message.send_cost())
}

/// Cost of editing `old` into `new`; zero means the two are visibly identical.
/// `forced` bumps a zero cost so the message is refreshed anyway.
pub fn update_cost(old: &MessageSpec, new: &MessageSpec, forced: bool) -> f64 {
    if !old.can_edit_into(new) {
        return f64::INFINITY;
    }
    let cost = EDIT_FACTOR * f64::from(old.edit_cost(new));
    if cost == 0.0 && forced {
        FORCED_UPDATE_COST
    } else {
        cost
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Track {
    Edited,
    Sent,
}

struct Table {
    width: usize,
    edited: Vec<f64>,
    sent: Vec<f64>,
}

impl Table {
    fn new(rows: usize, columns: usize) -> Self {
        let width = columns + 1;
        let len = (rows + 1) * width;
        Self {
            width,
            edited: vec![f64::INFINITY; len],
            sent: vec![f64::INFINITY; len],
        }
    }

    fn edited(&self, i: usize, j: usize) -> f64 {
        self.edited[i * self.width + j]
    }

    fn sent(&self, i: usize, j: usize) -> f64 {
        self.sent[i * self.width + j]
    }
}

/// Computes the cheapest action list turning `old` into `new`.
///
/// `force_key` names the old message that must not come out as a keep.
pub fn diff_screens(
    old: &[MessageSpec],
    new: &[MessageSpec],
    force_key: Option<&str>,
) -> Vec<ScreenAction> {
    let rows = old.len();
    let columns = new.len();
    let update = |i: usize, j: usize| {
        let forced = force_key.is_some_and(|key| old[i].key == key);
        update_cost(&old[i], &new[j], forced)
    };

    let mut table = Table::new(rows, columns);
    for i in 0..=rows {
        for j in 0..=columns {
            let at = i * table.width + j;
            if i == 0 && j == 0 {
                table.edited[at] = 0.0;
                continue;
            }

            let mut edited = f64::INFINITY;
            if i > 0 && j > 0 {
                edited = table.edited(i - 1, j - 1) + update(i - 1, j - 1);
            }
            if i > 0 {
                edited = edited.min(table.edited(i - 1, j) + DELETE_COST);
            }

            let mut sent = f64::INFINITY;
            if j > 0 {
                let cost = send_cost(&new[j - 1]);
                sent = (table.edited(i, j - 1) + cost).min(table.sent(i, j - 1) + cost);
            }
            if i > 0 {
                sent = sent.min(table.sent(i - 1, j) + DELETE_COST);
            }

            table.edited[at] = edited;
            table.sent[at] = sent;
        }
    }

    let mut track = if table.sent(rows, columns) < table.edited(rows, columns) {
        Track::Sent
    } else {
        Track::Edited
    };
    let (mut i, mut j) = (rows, columns);
    let mut actions = Vec::with_capacity(rows + columns);

    while i > 0 || j > 0 {
        match track {
            Track::Edited => {
                let here = table.edited(i, j);
                if i > 0 && j > 0 && here == table.edited(i - 1, j - 1) + update(i - 1, j - 1) {
                    let forced = force_key.is_some_and(|key| old[i - 1].key == key);
                    let (old, new) = (old[i - 1].clone(), new[j - 1].clone());
                    if !forced && old.edit_cost(&new) == 0 {
                        actions.push(ScreenAction::Keep { old, new });
                    } else {
                        actions.push(ScreenAction::Update { old, new });
                    }
                    i -= 1;
                    j -= 1;
                } else if i > 0 && here == table.edited(i - 1, j) + DELETE_COST {
                    actions.push(ScreenAction::Delete {
                        old: old[i - 1].clone(),
                    });
                    i -= 1;
                } else {
                    break;
                }
            }
            Track::Sent => {
                let here = table.sent(i, j);
                let cost = if j > 0 { send_cost(&new[j - 1]) } else { 0.0 };
                if j > 0 && here == table.edited(i, j - 1) + cost {
                    actions.push(ScreenAction::Send {
                        new: new[j - 1].clone(),
                    });
                    j -= 1;
                    track = Track::Edited;
                } else if j > 0 && here == table.sent(i, j - 1) + cost {
                    actions.push(ScreenAction::Send {
                        new: new[j - 1].clone(),
                    });
                    j -= 1;
                } else if i > 0 && here == table.sent(i - 1, j) + DELETE_COST {
                    actions.push(ScreenAction::Delete {
                        old: old[i - 1].clone(),
                    });
                    i -= 1;
                } else {
                    break;
                }
            }
        }
    }

    if i > 0 || j > 0 {
        log::error!("screen diff backtrace stalled at ({i}, {j}); falling back to a full resend");
        return full_reset(old, new);
    }

    actions.reverse();
    actions
}

/// Deletes every old message and sends every new one.
pub fn full_reset(old: &[MessageSpec], new: &[MessageSpec]) -> Vec<ScreenAction> {
    old.iter()
        .map(|old| ScreenAction::Delete { old: old.clone() })
        .chain(new.iter().map(|new| ScreenAction::Send { new: new.clone() }))
        .collect()
}

/// Total cost of an action list under the same cost model as [`diff_screens`].
pub fn total_cost(actions: &[ScreenAction], force_key: Option<&str>) -> f64 {
    actions
        .iter()
        .map(|action| match action {
            ScreenAction::Keep { .. } => 0.0,
            ScreenAction::Update { old, new } => {
                update_cost(old, new, force_key.is_some_and(|key| old.key == key))
            }
            ScreenAction::Delete { .. } => DELETE_COST,
            ScreenAction::Send { new } => send_cost(new),
        })
        .sum()
}

#[cfg(test)]
#[path = "tests/diff_tests.rs"]
mod tests;
