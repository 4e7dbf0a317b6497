//! Behavioural invariants of the pool resources, exercised through the
//! public `MemoryResource` surface.

use std::sync::atomic::{AtomicUsize, Ordering};

use segpool::{MemoryResource, SynchronizedPoolResource, UnsynchronizedPoolResource};

#[derive(Clone, Copy, Debug)]
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn gen_range_usize(&mut self, low: usize, high_inclusive: usize) -> usize {
        assert!(low <= high_inclusive);
        let span = high_inclusive - low + 1;
        low + (self.next_u64() as usize % span)
    }
}

#[test]
fn small_round_trip_returns_the_same_block() {
    let r = SynchronizedPoolResource::new();

    let p = r.allocate(16, 8).unwrap();
    unsafe { r.deallocate(p.as_ptr(), 16, 8) };
    let p2 = r.allocate(16, 8).unwrap();

    assert_eq!(p2, p);
    unsafe { r.deallocate(p2.as_ptr(), 16, 8) };
}

#[test]
fn free_lists_are_lifo_within_a_class() {
    let r = UnsynchronizedPoolResource::new();

    let p1 = r.allocate(16, 8).unwrap();
    let p2 = r.allocate(16, 8).unwrap();
    assert_ne!(p1, p2);

    unsafe {
        r.deallocate(p1.as_ptr(), 16, 8);
        r.deallocate(p2.as_ptr(), 16, 8);
    }

    let p3 = r.allocate(16, 8).unwrap();
    let p4 = r.allocate(16, 8).unwrap();
    assert_eq!(p3, p2);
    assert_eq!(p4, p1);

    unsafe {
        r.deallocate(p3.as_ptr(), 16, 8);
        r.deallocate(p4.as_ptr(), 16, 8);
    }
}

#[test]
fn requests_rounding_alike_draw_from_one_list() {
    let r = SynchronizedPoolResource::new();

    let p = r.allocate(9, 8).unwrap();
    unsafe { r.deallocate(p.as_ptr(), 9, 8) };
    let q = r.allocate(16, 8).unwrap();

    assert_eq!(q, p);
    unsafe { r.deallocate(q.as_ptr(), 16, 8) };
}

#[test]
fn refill_registers_one_chunk_per_batch() {
    let r = SynchronizedPoolResource::new();
    let mut live = Vec::new();

    for _ in 0..20 {
        live.push(r.allocate(8, 8).unwrap());
    }
    assert_eq!(r.chunk_count(), 1);
    assert_eq!(r.refill_count(), 1);

    live.push(r.allocate(8, 8).unwrap());
    assert_eq!(r.chunk_count(), 2);
    assert_eq!(r.refill_count(), 2);

    for p in live {
        unsafe { r.deallocate(p.as_ptr(), 8, 8) };
    }
    assert_eq!(r.chunk_count(), 2);
}

#[test]
fn large_objects_never_touch_the_registry() {
    let r = SynchronizedPoolResource::new();

    // Prime the pool so the registry is non-empty.
    let small = r.allocate(16, 8).unwrap();
    let before = r.chunk_count();

    let big = r.allocate(1024, 8).unwrap();
    assert_eq!(r.chunk_count(), before);
    unsafe { r.deallocate(big.as_ptr(), 1024, 8) };
    assert_eq!(r.chunk_count(), before);

    unsafe { r.deallocate(small.as_ptr(), 16, 8) };
}

#[test]
fn over_aligned_small_request_is_honoured_via_the_large_path() {
    let r = SynchronizedPoolResource::new();
    let before = r.chunk_count();

    let p = r.allocate(64, 64).unwrap();
    assert_eq!(p.as_ptr() as usize % 64, 0);
    assert_eq!(r.chunk_count(), before);

    unsafe { r.deallocate(p.as_ptr(), 64, 64) };
}

#[test]
fn resources_are_equal_only_by_identity() {
    let r1 = SynchronizedPoolResource::new();
    let r2 = SynchronizedPoolResource::new();

    assert!(r1.is_equal(&r1));
    assert!(!r1.is_equal(&r2));
    assert!(!r2.is_equal(&r1));
}

#[test]
fn synchronized_resource_survives_contention() {
    const THREADS: usize = 4;
    const ITERATIONS: usize = 1000;

    let r = SynchronizedPoolResource::new();
    let completed = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for t in 0..THREADS {
            let r = &r;
            let completed = &completed;
            scope.spawn(move || {
                let mut held = Vec::with_capacity(8);
                for i in 0..ITERATIONS {
                    let p = r.allocate(16, 8).unwrap();
                    // Stamp the block; a race handing one block to two
                    // threads would corrupt somebody's stamp.
                    let stamp = (t * ITERATIONS + i) as u64;
                    unsafe {
                        p.as_ptr().cast::<u64>().write(stamp);
                        p.as_ptr().cast::<u64>().add(1).write(stamp);
                    }
                    held.push((p, stamp));

                    if held.len() == 8 {
                        for (q, s) in held.drain(..) {
                            unsafe {
                                assert_eq!(q.as_ptr().cast::<u64>().read(), s);
                                assert_eq!(q.as_ptr().cast::<u64>().add(1).read(), s);
                                r.deallocate(q.as_ptr(), 16, 8);
                            }
                            completed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
                for (q, s) in held {
                    unsafe {
                        assert_eq!(q.as_ptr().cast::<u64>().read(), s);
                        r.deallocate(q.as_ptr(), 16, 8);
                    }
                    completed.fetch_add(1, Ordering::Relaxed);
                }
            });
        }
    });

    assert_eq!(completed.load(Ordering::Relaxed), THREADS * ITERATIONS);
}

#[test]
fn randomized_sequences_keep_live_blocks_disjoint() {
    const SEEDS: [u64; 4] = [1, 2, 3, 4];
    const STEPS: usize = 4_000;
    const SLOTS: usize = 64;

    for seed in SEEDS {
        let r = UnsynchronizedPoolResource::new();
        let mut rng = XorShift64::new(seed);

        let mut ptrs = [std::ptr::null_mut::<u8>(); SLOTS];
        let mut sizes = [0_usize; SLOTS];

        for step in 0..STEPS {
            let idx = rng.gen_range_usize(0, SLOTS - 1);

            if ptrs[idx].is_null() {
                // Mix small, boundary, and large requests.
                let bytes = match rng.gen_range_usize(0, 9) {
                    0 => 0,
                    1..=6 => rng.gen_range_usize(1, 128),
                    7 => 128,
                    _ => rng.gen_range_usize(129, 4096),
                };
                let p = r.allocate(bytes, 8).unwrap();
                // Fill with a slot tag; any overlap between live blocks
                // shows up as a corrupted tag on release.
                unsafe { std::ptr::write_bytes(p.as_ptr(), idx as u8, bytes.max(1)) };
                ptrs[idx] = p.as_ptr();
                sizes[idx] = bytes;
            } else {
                let bytes = sizes[idx];
                unsafe {
                    for off in 0..bytes.max(1) {
                        assert_eq!(
                            *ptrs[idx].add(off),
                            idx as u8,
                            "seed={seed} step={step} slot={idx} offset={off}: live block overwritten"
                        );
                    }
                    r.deallocate(ptrs[idx], bytes, 8);
                }
                ptrs[idx] = std::ptr::null_mut();
            }
        }

        // Drain what's left; the resource must still be fully usable.
        for idx in 0..SLOTS {
            if !ptrs[idx].is_null() {
                unsafe { r.deallocate(ptrs[idx], sizes[idx], 8) };
            }
        }
        let p = r.allocate(32, 8).unwrap();
        unsafe { r.deallocate(p.as_ptr(), 32, 8) };
    }
}
