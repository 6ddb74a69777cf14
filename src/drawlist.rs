//! The draw list: an ordered, growable buffer of [`Entry`] records plus the
//! bitpack compression pass (spec.md §3, §4.1).

use log::{debug, trace};
use smallvec::SmallVec;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::constants::{BITPACK_MAX_DELTA, SUBDIV};
use crate::entry::{Command, Entry};
use crate::opcode::Opcode;

/// Draw-list flags (spec.md §3: "a flags word (edge-list / current-path /
/// doesn't-own-entries / screen-space / relative / bitpack)").
pub mod flags {
    pub const EDGE_LIST: u32 = 1 << 0;
    pub const CURRENT_PATH: u32 = 1 << 1;
    /// Set on a view over externally-owned entries; `add_entry` becomes a
    /// no-op and the backing buffer is never reallocated.
    pub const DOESNT_OWN_ENTRIES: u32 = 1 << 2;
    pub const SCREEN_SPACE: u32 = 1 << 3;
    pub const RELATIVE: u32 = 1 << 4;
    pub const BITPACK: u32 = 1 << 5;
}

const DEFAULT_MIN_CAPACITY: usize = 64;
const DEFAULT_MAX_ENTRIES: usize = 1 << 20;

/// An ordered sequence of entries with a count, an allocated capacity, a
/// flags word, and a `bitpack_pos` cursor tracking the prefix already
/// compressed (spec.md §3).
pub struct DrawList {
    entries: Vec<Entry>,
    flags: u32,
    bitpack_pos: usize,
    max_entries: usize,
    min_capacity: usize,
}

impl Default for DrawList {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawList {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MIN_CAPACITY, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_limits(min_capacity: usize, max_entries: usize) -> Self {
        DrawList {
            entries: Vec::with_capacity(min_capacity),
            flags: 0,
            bitpack_pos: 0,
            max_entries,
            min_capacity,
        }
    }

    /// Wraps an externally-owned, already-populated entry slice as a
    /// non-reallocating view (`DOESNT_OWN_ENTRIES`).
    pub fn from_view(entries: Vec<Entry>) -> Self {
        DrawList {
            bitpack_pos: entries.len(),
            max_entries: entries.len(),
            min_capacity: entries.len(),
            entries,
            flags: flags::DOESNT_OWN_ENTRIES,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn set_flag(&mut self, flag: u32) {
        self.flags |= flag;
    }

    pub fn clear_flag(&mut self, flag: u32) {
        self.flags &= !flag;
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn bitpack_pos(&self) -> usize {
        self.bitpack_pos
    }

    fn grow_for(&mut self, additional: usize) {
        let needed = self.entries.len() + additional;
        if needed <= self.entries.capacity() {
            return;
        }
        let grown = ((self.entries.capacity() as f64) * 1.5).ceil() as usize;
        let new_cap = grown.max(needed).max(self.min_capacity).min(self.max_entries);
        self.entries.reserve(new_cap.saturating_sub(self.entries.len()));
    }

    /// Appends `cmd`'s leading entry and continuations. Returns the index
    /// of the leading entry, or the current length if the draw list is at
    /// its hard maximum — "callers cannot distinguish" is intentional
    /// (spec.md §4.1), so this never returns `Result`.
    pub fn add_entry(&mut self, cmd: &Command) -> usize {
        if self.has_flag(flags::DOESNT_OWN_ENTRIES) {
            debug!("add_entry on a view-only draw list ignored");
            return self.entries.len();
        }
        let encoded = cmd.encode();
        if self.entries.len() + encoded.len() > self.max_entries {
            debug!("draw list at max entries ({}); dropping append", self.max_entries);
            return self.entries.len();
        }
        self.grow_for(encoded.len());
        let idx = self.entries.len();
        self.entries.extend_from_slice(&encoded);
        idx
    }

    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
        self.bitpack_pos = self.bitpack_pos.min(self.entries.len());
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.bitpack_pos = 0;
    }

    /// Decodes, in order, every command starting at or after `pos`.
    pub fn iter(&self, expand_bitpack: bool) -> DrawListIter<'_> {
        DrawListIter { list: self, pos: 0, expand_bitpack, pending: SmallVec::new() }
    }

    /// Walks from `bitpack_pos` to `count - 4`, folding runs of small
    /// relative-motion opcodes into their densified form (spec.md §4.1).
    /// Idempotent: a second call with no new entries appended is a no-op,
    /// since `bitpack_pos` already covers everything rewritable.
    pub fn bitpack(&mut self) {
        if self.has_flag(flags::DOESNT_OWN_ENTRIES) {
            return;
        }
        let start = self.bitpack_pos;
        let len = self.entries.len();
        if len < start + 4 {
            return;
        }
        let mut read = start;
        let mut any = false;
        // Leave the last few entries (the "residue") uncompressed until
        // more data arrives, matching the source's windowed scan.
        while read + 4 <= len {
            if self.try_fuse_curve_line(read) {
                any = true;
                read += 2;
                continue;
            }
            if self.try_fuse_line_x4(read) {
                any = true;
                read += 4;
                continue;
            }
            read += 1;
        }
        if any {
            self.entries.retain(|e| e.opcode != Opcode::Nop.to_u8());
            trace!("bitpack compacted draw list to {} entries", self.entries.len());
        }
        self.bitpack_pos = self.entries.len();
    }

    fn try_fuse_line_x4(&mut self, at: usize) -> bool {
        let window = &self.entries[at..at + 4];
        if window.iter().any(|e| e.opcode != Opcode::RelLineTo.to_u8()) {
            return false;
        }
        let mut deltas = [0i8; 8];
        for (i, e) in window.iter().enumerate() {
            match quantize_delta(*e) {
                Some((dx, dy)) => {
                    deltas[i * 2] = dx;
                    deltas[i * 2 + 1] = dy;
                }
                None => return false,
            }
        }
        self.entries[at] = Entry::leading(Opcode::RelLineToX4, Entry::pack_i8x8(deltas));
        for slot in &mut self.entries[at + 1..at + 4] {
            *slot = Entry::leading(Opcode::Nop, [0u8; 8]);
        }
        true
    }

    fn try_fuse_curve_line(&mut self, at: usize) -> bool {
        if self.entries[at].opcode != Opcode::RelCurveTo.to_u8() {
            return false;
        }
        if at + 2 >= self.entries.len() || self.entries[at + 2].opcode != Opcode::RelLineTo.to_u8()
        {
            return false;
        }
        let leading = self.entries[at];
        let cont1 = self.entries[at + 1];
        let (dx1, dy1) = leading.read_f32x2();
        let (dx2, dy2) = cont1.read_f32x2();
        let dx1i = quantize_component(dx1);
        let dy1i = quantize_component(dy1);
        let dx2i = quantize_component(dx2);
        let dy2i = quantize_component(dy2);
        let (dx1i, dy1i, dx2i, dy2i) = match (dx1i, dy1i, dx2i, dy2i) {
            (Some(a), Some(b), Some(c), Some(d)) => (a, b, c, d),
            _ => return false,
        };
        let line = self.entries[at + 2];
        let (lx, ly) = line.read_f32x2();
        let line_q = quantize_delta(line);
        let (lxi, lyi) = match line_q {
            Some(v) => v,
            None => return false,
        };
        let _ = (lx, ly);
        let deltas = [dx1i, dy1i, dx2i, dy2i, 0, 0, lxi, lyi];
        self.entries[at] = Entry::leading(Opcode::RelCurveToRelLineTo, Entry::pack_i8x8(deltas));
        self.entries[at + 1] = Entry::leading(Opcode::Nop, [0u8; 8]);
        self.entries[at + 2] = Entry::leading(Opcode::Nop, [0u8; 8]);
        true
    }
}

fn quantize_component(v: f32) -> Option<i8> {
    let scaled = (v * SUBDIV as f32).round();
    if scaled.abs() > BITPACK_MAX_DELTA as f32 {
        None
    } else {
        Some(scaled as i8)
    }
}

fn quantize_delta(e: Entry) -> Option<(i8, i8)> {
    let (dx, dy) = e.read_f32x2();
    Some((quantize_component(dx)?, quantize_component(dy)?))
}

pub struct DrawListIter<'a> {
    list: &'a DrawList,
    pos: usize,
    expand_bitpack: bool,
    pending: SmallVec<[(usize, Command); 4]>,
}

impl<'a> Iterator for DrawListIter<'a> {
    type Item = (usize, Command);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(item) = self.pending.pop() {
            return Some(item);
        }
        if self.pos >= self.list.entries.len() {
            return None;
        }
        let remaining = &self.list.entries[self.pos..];
        let (cmd, consumed) = Command::decode(remaining)?;
        let start = self.pos;
        self.pos += consumed;

        if self.expand_bitpack {
            match &cmd {
                Command::RelLineToX4 { deltas } => {
                    for i in (0..4).rev() {
                        let dx = deltas[i * 2] as f32 / SUBDIV as f32;
                        let dy = deltas[i * 2 + 1] as f32 / SUBDIV as f32;
                        self.pending.push((start, Command::RelLineTo { dx, dy }));
                    }
                    return self.next();
                }
                Command::RelCurveToRelLineTo { deltas } => {
                    // spec.md §9: the source's guard is literally
                    // `s8[6] == 0 && s8[7] == 0` — a structural shortcut,
                    // not a geometric claim (a real curve could legitimately
                    // end with a zero-length trailing line).
                    let has_line = deltas[6] != 0 || deltas[7] != 0;
                    if has_line {
                        self.pending.push((
                            start,
                            Command::RelLineTo {
                                dx: deltas[6] as f32 / SUBDIV as f32,
                                dy: deltas[7] as f32 / SUBDIV as f32,
                            },
                        ));
                    }
                    self.pending.push((
                        start,
                        Command::RelCurveTo {
                            dx1: deltas[0] as f32 / SUBDIV as f32,
                            dy1: deltas[1] as f32 / SUBDIV as f32,
                            dx2: deltas[2] as f32 / SUBDIV as f32,
                            dy2: deltas[3] as f32 / SUBDIV as f32,
                            dx: 0.0,
                            dy: 0.0,
                        },
                    ));
                    return self.next();
                }
                _ => {}
            }
        }
        Some((start, cmd))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_square_path(list: &mut DrawList) {
        list.add_entry(&Command::MoveTo { x: 0.0, y: 0.0 });
        list.add_entry(&Command::RelLineTo { dx: 1.0, dy: 0.0 });
        list.add_entry(&Command::RelLineTo { dx: 0.0, dy: 1.0 });
        list.add_entry(&Command::RelLineTo { dx: -1.0, dy: 0.0 });
        list.add_entry(&Command::RelLineTo { dx: 0.0, dy: -1.0 });
        list.add_entry(&Command::ClosePath);
        list.add_entry(&Command::Fill);
    }

    #[test]
    fn bitpack_fuses_four_rel_line_tos() {
        let mut list = DrawList::new();
        push_square_path(&mut list);
        let before = list.len();
        list.bitpack();
        assert!(list.len() < before);
        let ops: Vec<_> = list.iter(false).map(|(_, c)| c.opcode()).collect();
        assert!(ops.contains(&Opcode::RelLineToX4));
    }

    #[test]
    fn bitpack_is_idempotent() {
        let mut list = DrawList::new();
        push_square_path(&mut list);
        list.bitpack();
        let snapshot: Vec<Entry> = list.entries().to_vec();
        list.bitpack();
        assert_eq!(list.entries(), snapshot.as_slice());
    }

    #[test]
    fn expand_after_bitpack_matches_original_within_tolerance() {
        let mut list = DrawList::new();
        push_square_path(&mut list);
        let original: Vec<Command> = list.iter(true).map(|(_, c)| c).collect();
        list.bitpack();
        let expanded: Vec<Command> = list.iter(true).map(|(_, c)| c).collect();
        assert_eq!(original.len(), expanded.len());
        for (a, b) in original.iter().zip(expanded.iter()) {
            match (a, b) {
                (Command::RelLineTo { dx: dx1, dy: dy1 }, Command::RelLineTo { dx: dx2, dy: dy2 }) => {
                    assert!((dx1 - dx2).abs() <= 1.0 / SUBDIV as f32);
                    assert!((dy1 - dy2).abs() <= 1.0 / SUBDIV as f32);
                }
                _ => assert_eq!(a, b),
            }
        }
    }

    #[test]
    fn view_only_list_never_reallocates_or_appends() {
        let mut view = DrawList::from_view(vec![Entry::leading(Opcode::Fill, [0u8; 8])]);
        let len_before = view.len();
        view.add_entry(&Command::Save);
        assert_eq!(view.len(), len_before);
    }
}
