//! Fixed-point resolutions and capacity limits shared across the codec, the
//! edge list and the scanline engine. Kept as plain `pub const`s rather than
//! a config struct: every one of these is either a wire-format invariant
//! (changing it breaks on-disk compatibility) or a resource cap with a
//! documented default, not a runtime tunable.

/// Sub-pixel resolution for x coordinates inside the edge list: `SUBDIV`
/// units per device pixel (spec.md §3, §4.6).
pub const SUBDIV: i32 = 8;

/// Sub-pixel resolution for y coordinates inside the edge list, i.e. the
/// maximum vertical supersampling rate (spec.md §3, §4.6).
pub const FULL_AA: i32 = 15;

/// Number of fractional bits used when splitting an accumulated x-span back
/// into a whole pixel index plus a coverage remainder (spec.md §4.6).
pub const FRACBITS: i32 = 8;

/// Active edges track their current x position as `x << EDGE_MULT_SHIFT`;
/// matches `FRACBITS` so the two meet at the coverage-generation step.
pub const EDGE_MULT_SHIFT: i32 = FRACBITS;
pub const EDGE_MULT: i32 = 1 << EDGE_MULT_SHIFT;

/// Largest per-component delta the bitpack pass may fold into a signed
/// byte, in `SUBDIV` units (spec.md §3, §4.1: "within ±(127/SUBDIV)"). `114`
/// rather than `127` leaves headroom for the rounding error introduced when
/// expanding the packed delta back out at iteration time.
pub const BITPACK_MAX_DELTA: i32 = 114;

/// Hard recursion cap for adaptive cubic Bezier flattening (spec.md §4.5).
pub const BEZIER_MAX_DEPTH: u32 = 8;

/// Hard cap on the segment count used to approximate an arc (spec.md §4.5:
/// `segments = min(120, radius * 2π)`).
pub const ARC_MAX_SEGMENTS: usize = 120;

/// Angle clamp applied by `arc`/`arc_to`. Preserved verbatim per spec.md §9:
/// "almost certainly defensive against runaway loops but not mathematically
/// motivated... legacy behavior, verify against corpus before altering".
pub const ARC_ANGLE_CLAMP: f32 = 30.0;

/// Maximum gradient stops a single `GState` source can carry (spec.md §3).
pub const MAX_GRADIENT_STOPS: usize = 16;

/// Length of a primed gradient LUT (spec.md §3, §4.9).
pub const GRADIENT_LUT_LEN: usize = 256;

/// Default depth of the `GState` save/restore stack (spec.md §3: "typical
/// depth 10").
pub const DEFAULT_GSTATE_DEPTH: usize = 10;

/// Capacity of a `GState`'s key-value property database (spec.md §3).
pub const KEYDB_CAPACITY: usize = 64;

/// Magic byte marking a stringpool-resident blob as a stored color rather
/// than a plain string (spec.md §3).
pub const KEYDB_COLOR_BLOB_TAG: u8 = 127;

/// Base subtracted from a stringpool offset when it's encoded as a negative
/// float inside the keydb: a pool offset `n` is stored as
/// `KEYDB_STRINGPOOL_BASE + n as f64` (spec.md §3: "`-90000 + offset`"). The
/// exact constant is preserved for wire compatibility with the textual
/// format's numeric literals.
pub const KEYDB_STRINGPOOL_BASE: f64 = -90000.0;

/// Default slot count of the shape cache (spec.md §3: "fixed slot count
/// (default 160)").
pub const SHAPE_CACHE_SLOTS: usize = 160;

/// Default tile grid used by the hasher back end and the tiled scheduler
/// (spec.md §4.10: "HASH_ROWS × HASH_COLS tiles (default 8×8)").
pub const HASH_ROWS: usize = 8;
pub const HASH_COLS: usize = 8;

/// Length the parser clamps a string/number scratch token to before
/// dropping the offending entry (spec.md §4.3: "`PARSER_MAXLEN`").
pub const PARSER_MAXLEN: usize = 4096;
