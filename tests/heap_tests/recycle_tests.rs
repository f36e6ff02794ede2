//! Tests for RecyclingHeap
//!
//! These tests verify:
//! - Root node initialization
//! - Fallback to the wrapped allocator when nothing is free
//! - LIFO reuse of cached pages
//! - Flushing to the free chain on overflow and on close
//! - Reloading from the chain before the heap grows
//! - Demotion of a full root into a chained node

use pageheap::freeset::chain::{self, ChainNode, CHAIN_SIGNATURE};
use pageheap::{BumpHeap, Config, HeapError, Medium, MemoryMedium, Page, RecyclingHeap};

type Heap = RecyclingHeap<BumpHeap<MemoryMedium>>;

const STR: &[u8] = b"This is a string.";
const META: usize = 256;

// =============================================================================
// Helper Functions
// =============================================================================

fn config() -> Config {
    Config::builder()
        .block_length(256)
        .page_span(4)
        .metadata_length(META)
        .build()
}

/// Fresh heap whose free chain is rooted at page 0
fn new_heap(medium: &MemoryMedium, cache_limit: usize) -> Heap {
    let base = BumpHeap::open(medium.clone(), &config()).unwrap();
    let root = base.allocate().unwrap().address();
    RecyclingHeap::open(base, root, cache_limit).unwrap()
}

/// Reopen a closed heap from its memory image
fn reopen(medium: &MemoryMedium, cache_limit: usize) -> (MemoryMedium, Heap) {
    let medium = MemoryMedium::from_bytes(&medium.snapshot());
    let base = BumpHeap::open(medium.clone(), &config()).unwrap();
    let heap = RecyclingHeap::open(base, 0, cache_limit).unwrap();
    (medium, heap)
}

fn i32_at(bytes: &[u8], at: usize) -> i32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[at..at + 4]);
    i32::from_be_bytes(word)
}

fn i64_at(bytes: &[u8], at: usize) -> i64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[at..at + 8]);
    i64::from_be_bytes(word)
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_initializes_root() {
    let medium = MemoryMedium::new();
    let heap = new_heap(&medium, 1);
    heap.close().unwrap();

    let image = medium.snapshot();
    assert_eq!(i32_at(&image, META), CHAIN_SIGNATURE);
    assert_eq!(i64_at(&image, META + 4), -1);
    assert_eq!(i32_at(&image, META + 12), 0);
}

#[test]
fn test_open_rejects_oversized_count() {
    let medium = MemoryMedium::new();
    let base = BumpHeap::open(medium.clone(), &config()).unwrap();
    base.allocate().unwrap();

    let mut node = Vec::new();
    node.extend_from_slice(&CHAIN_SIGNATURE.to_be_bytes());
    node.extend_from_slice(&(-1i64).to_be_bytes());
    node.extend_from_slice(&1000i32.to_be_bytes());
    medium.write(META as u64, &node).unwrap();

    let result = RecyclingHeap::open(base, 0, 16);

    assert!(matches!(result, Err(HeapError::Corruption(_))));
}

#[test]
fn test_open_rejects_tiny_root() {
    let config = Config::builder()
        .block_length(40)
        .page_span(1)
        .metadata_length(40)
        .build();
    let base = BumpHeap::open(MemoryMedium::new(), &config).unwrap();
    base.allocate().unwrap();

    assert!(matches!(
        RecyclingHeap::open(base, 0, 16),
        Err(HeapError::Config(_))
    ));
}

// =============================================================================
// Allocation Tests
// =============================================================================

#[test]
fn test_fallback_to_base_allocation() {
    let medium = MemoryMedium::new();
    let mut heap = new_heap(&medium, 1);

    let page = heap.allocate().unwrap();
    let page2 = heap.allocate().unwrap();

    assert_eq!(page.address(), 1024);
    assert_eq!(page2.address(), 2048);
    assert_eq!(heap.base().heap_size(), 3072);
}

#[test]
fn test_reuse_is_lifo() {
    let medium = MemoryMedium::new();
    let mut heap = new_heap(&medium, 16);
    let a = heap.allocate().unwrap().address();
    let b = heap.allocate().unwrap().address();

    heap.free(&[a, b]).unwrap();

    assert_eq!(heap.allocate().unwrap().address(), b);
    assert_eq!(heap.allocate().unwrap().address(), a);
    assert_eq!(heap.base().heap_size(), 3072);
    assert_eq!(heap.allocate().unwrap().address(), 3072);
}

#[test]
fn test_recycled_page_keeps_content() {
    let medium = MemoryMedium::new();
    let mut heap = new_heap(&medium, 16);
    let mut page = heap.allocate().unwrap();
    page.write(10, STR).unwrap();
    page.commit().unwrap();

    heap.free(&[page.address()]).unwrap();
    let again = heap.allocate().unwrap();

    assert_eq!(again.address(), 1024);
    assert_eq!(again.read_vec(10, STR.len()).unwrap(), STR);
}

// =============================================================================
// Free Tests
// =============================================================================

#[test]
fn test_free_flushes_on_close() {
    let medium = MemoryMedium::new();
    let mut heap = new_heap(&medium, 16);
    let a = heap.allocate().unwrap().address();
    let b = heap.allocate().unwrap().address();

    heap.free(&[a]).unwrap();
    heap.free(&[b]).unwrap();
    assert_eq!(heap.persisted_count().unwrap(), 0);
    heap.close().unwrap();

    let image = medium.snapshot();
    assert_eq!(i32_at(&image, META), CHAIN_SIGNATURE);
    assert_eq!(i64_at(&image, META + 4), -1);
    assert_eq!(i32_at(&image, META + 12), 2);
    assert_eq!(i64_at(&image, META + 16), 1024);
    assert_eq!(i64_at(&image, META + 24), 2048);
}

#[test]
fn test_free_over_limit_flushes() {
    let medium = MemoryMedium::new();
    let mut heap = new_heap(&medium, 2);
    let addresses: Vec<u64> = (0..3).map(|_| heap.allocate().unwrap().address()).collect();

    heap.free(&addresses[..2]).unwrap();
    assert_eq!(heap.cached(), &addresses[..2]);

    heap.free(&addresses[2..]).unwrap();
    assert!(heap.cached().is_empty());
    assert_eq!(heap.persisted_count().unwrap(), 3);
}

#[test]
fn test_free_rejects_invalid_addresses() {
    let medium = MemoryMedium::new();
    let mut heap = new_heap(&medium, 16);
    let a = heap.allocate().unwrap().address();
    let b = heap.allocate().unwrap().address();
    heap.free(&[a]).unwrap();

    // Root
    assert!(matches!(heap.free(&[0]), Err(HeapError::InvalidAddress(_))));
    // Misaligned
    assert!(matches!(heap.free(&[100]), Err(HeapError::InvalidAddress(_))));
    // Already cached
    assert!(matches!(heap.free(&[a]), Err(HeapError::InvalidAddress(_))));
    // Repeated within one call
    assert!(matches!(
        heap.free(&[b, b]),
        Err(HeapError::InvalidAddress(_))
    ));

    assert_eq!(heap.cached(), &[a]);
}

#[test]
fn test_free_rejects_header_page() {
    let config = Config::builder()
        .block_length(64)
        .page_span(1)
        .metadata_length(40)
        .build();
    let base = BumpHeap::open(MemoryMedium::new(), &config).unwrap();
    base.allocate().unwrap();
    let root = base.allocate().unwrap().address();
    let mut heap = RecyclingHeap::open(base, root, 4).unwrap();

    assert!(matches!(heap.free(&[0]), Err(HeapError::InvalidAddress(_))));
    assert!(heap.cached().is_empty());
}

#[test]
fn test_free_rejects_unallocated_page() {
    let medium = MemoryMedium::new();
    let mut heap = new_heap(&medium, 16);
    let a = heap.allocate().unwrap().address();

    let result = heap.free(&[a, 100 * 1024]);

    assert!(matches!(result, Err(HeapError::InvalidAddress(_))));
    assert!(heap.cached().is_empty());

    // Nothing was recorded, so the next page is fresh
    assert_eq!(heap.allocate().unwrap().address(), 2048);
}

#[test]
fn test_failed_reuse_keeps_address_cached() {
    let medium = MemoryMedium::new();
    let mut heap = new_heap(&medium, 16);

    // Chain entry pointing past the heap boundary
    let mut root = heap.base().fetch(0).unwrap();
    root.write(12, &1i32.to_be_bytes()).unwrap();
    root.write(16, &(100i64 * 1024).to_be_bytes()).unwrap();
    root.commit().unwrap();

    assert!(matches!(heap.allocate(), Err(HeapError::OutOfRange(_))));
    assert_eq!(heap.cached(), &[100 * 1024u64]);
    assert!(matches!(heap.allocate(), Err(HeapError::OutOfRange(_))));
}

// =============================================================================
// Reload Tests
// =============================================================================

#[test]
fn test_reload_before_growing() {
    let medium = MemoryMedium::new();
    {
        let mut heap = new_heap(&medium, 16);
        let a = heap.allocate().unwrap().address();
        let b = heap.allocate().unwrap().address();
        heap.free(&[a, b]).unwrap();
        heap.close().unwrap();
    }

    let (image, mut heap) = reopen(&medium, 16);
    assert_eq!(heap.persisted_count().unwrap(), 2);

    assert_eq!(heap.allocate().unwrap().address(), 2048);
    assert_eq!(heap.persisted_count().unwrap(), 0);
    assert_eq!(heap.allocate().unwrap().address(), 1024);
    assert_eq!(heap.allocate().unwrap().address(), 3072);

    heap.close().unwrap();
    assert_eq!(i32_at(&image.snapshot(), META + 12), 0);
}

#[test]
fn test_reload_respects_cache_limit() {
    let medium = MemoryMedium::new();
    {
        let mut heap = new_heap(&medium, 16);
        let addresses: Vec<u64> = (0..5).map(|_| heap.allocate().unwrap().address()).collect();
        heap.free(&addresses).unwrap();
        heap.close().unwrap();
    }

    let (_image, mut heap) = reopen(&medium, 2);
    heap.allocate().unwrap();

    assert_eq!(heap.cached().len(), 1);
    assert_eq!(heap.persisted_count().unwrap(), 3);
}

// =============================================================================
// Chain Tests
// =============================================================================

#[test]
fn test_full_root_is_demoted_into_chain() {
    // 64-byte pages: a node holds 6 addresses
    let config = Config::builder()
        .block_length(64)
        .page_span(1)
        .metadata_length(40)
        .build();
    let base = BumpHeap::open(MemoryMedium::new(), &config).unwrap();
    base.allocate().unwrap();
    let root = base.allocate().unwrap().address();
    let mut heap = RecyclingHeap::open(base, root, 4).unwrap();

    let addresses: Vec<u64> = (0..10).map(|_| heap.allocate().unwrap().address()).collect();
    assert_eq!(addresses[0], 128);
    heap.free(&addresses).unwrap();

    let nodes = chain::walk(heap.base_mut(), root).unwrap();
    assert_eq!(
        nodes,
        vec![
            ChainNode {
                address: root,
                count: 3,
                next: Some(addresses[6]),
            },
            ChainNode {
                address: addresses[6],
                count: 6,
                next: None,
            },
        ]
    );

    // Every freed page comes back, chain node included, before the heap grows
    let heap_size = heap.base().heap_size();
    let mut reused: Vec<u64> = (0..10).map(|_| heap.allocate().unwrap().address()).collect();
    reused.sort_unstable();

    assert_eq!(reused, addresses);
    assert_eq!(heap.base().heap_size(), heap_size);
    assert_eq!(heap.allocate().unwrap().address(), heap_size);
}

#[test]
fn test_walk_detects_loop() {
    let medium = MemoryMedium::new();
    let mut heap = new_heap(&medium, 16);

    // Root chained to itself
    let mut root = heap.base().fetch(0).unwrap();
    root.write(4, &0i64.to_be_bytes()).unwrap();
    root.commit().unwrap();

    assert!(matches!(
        chain::walk(heap.base_mut(), 0),
        Err(HeapError::Corruption(_))
    ));
}

// =============================================================================
// Session Tests
// =============================================================================

#[test]
fn test_session_recycles_pages() {
    use pageheap::Allocator;

    let medium = MemoryMedium::new();
    let mut heap = new_heap(&medium, 16);
    let mut session = heap.session();

    let page = session.alloc().unwrap();
    let address = page.address();
    session.free(page).unwrap();

    assert_eq!(session.alloc().unwrap().address(), address);
    assert!(session.commit().is_ok());
}
