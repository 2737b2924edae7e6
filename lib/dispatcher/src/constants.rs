/// Per-worker system inbox capacity, sized larger than the default used for
/// `queues_sizes`-declared topology queues since it also carries
/// admin/control traffic. See DESIGN.md's Open Question OQ-1 for why the
/// two are kept separate rather than unified.
pub const SYSTEM_INBOX_CAPACITY: u32 = 1000;
