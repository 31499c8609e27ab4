use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

use rust_nnet::aggregate::sequential_accumulate_with;
use rust_nnet::{AccumulateScratch, Activation, Dataset, NetworkBuilder};

struct CountingAlloc {
    allocs: AtomicUsize,
    reallocs: AtomicUsize,
}

impl CountingAlloc {
    const fn new() -> Self {
        Self {
            allocs: AtomicUsize::new(0),
            reallocs: AtomicUsize::new(0),
        }
    }

    fn reset(&self) {
        self.allocs.store(0, Ordering::Relaxed);
        self.reallocs.store(0, Ordering::Relaxed);
    }

    fn alloc_events(&self) -> usize {
        self.allocs.load(Ordering::Relaxed) + self.reallocs.load(Ordering::Relaxed)
    }
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.allocs.fetch_add(1, Ordering::Relaxed);
        unsafe { System.alloc(layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        self.allocs.fetch_add(1, Ordering::Relaxed);
        unsafe { System.alloc_zeroed(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        self.reallocs.fetch_add(1, Ordering::Relaxed);
        unsafe { System.realloc(ptr, layout, new_size) }
    }
}

#[global_allocator]
static ALLOC: CountingAlloc = CountingAlloc::new();

fn make_dataset(len: usize, input_dim: usize, target_dim: usize) -> Dataset {
    let inputs = vec![0.1; len * input_dim];
    let targets = vec![0.0; len * target_dim];
    Dataset::from_flat(inputs, targets, input_dim, target_dim).unwrap()
}

#[test]
fn sequential_accumulate_does_not_allocate_per_sample() {
    let input_dim = 16;
    let output_dim = 4;

    let net = NetworkBuilder::new(input_dim)
        .unwrap()
        .add_layer(32, Activation::Tanh)
        .unwrap()
        .add_layer(output_dim, Activation::Linear)
        .unwrap()
        .build_with_seed(0)
        .unwrap();

    let small = make_dataset(8, input_dim, output_dim);
    let large = make_dataset(8 * 64, input_dim, output_dim);

    let mut scratch = AccumulateScratch::new(&net);
    let mut grad = net.new_per_parameter_buffer();

    ALLOC.reset();
    sequential_accumulate_with(&small, &net, &mut grad, &mut scratch).unwrap();
    let alloc_small = ALLOC.alloc_events();

    ALLOC.reset();
    sequential_accumulate_with(&large, &net, &mut grad, &mut scratch).unwrap();
    let alloc_large = ALLOC.alloc_events();

    assert_eq!(
        alloc_small, alloc_large,
        "expected allocation count to be independent of the number of samples"
    );
}
