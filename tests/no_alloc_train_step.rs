use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use simple_nn::{Init, Matrix, Mlp, MlpBuilder};

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

// The counter is process-wide; tests must not overlap.
static SERIAL: Mutex<()> = Mutex::new(());

fn column_batch(rows: usize, cols: usize, value: f32) -> Matrix {
    Matrix::from_vec(rows, cols, vec![value; rows * cols]).unwrap()
}

#[test]
fn train_step_does_not_allocate_after_build() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let input_dim = 16;
    let max_batch = 32;

    let mut mlp = MlpBuilder::new(input_dim)
        .unwrap()
        .hidden(32, 16)
        .unwrap()
        .max_batch(max_batch)
        .unwrap()
        .init(Init::He)
        .unwrap()
        .build_with_seed(0)
        .unwrap();

    let x_full = column_batch(input_dim, max_batch, 0.1);
    let y_full = Matrix::from_vec(
        1,
        max_batch,
        (0..max_batch).map(|i| (i % 2) as f32).collect(),
    )
    .unwrap();
    let x_narrow = column_batch(input_dim, 5, -0.3);
    let y_narrow = column_batch(1, 5, 1.0);

    let mut run = |steps: usize| {
        ALLOC.reset();
        for _ in 0..steps {
            mlp.train_step(&x_full, &y_full, 0.05).unwrap();
            mlp.train_step(&x_narrow, &y_narrow, 0.05).unwrap();
            mlp.predict(&x_full).unwrap();
        }
        ALLOC.alloc_events()
    };

    let few = run(1);
    let many = run(50);

    assert_eq!(
        few, many,
        "expected allocation events to be independent of the number of steps"
    );
}

#[test]
fn cloned_model_trains_without_allocating() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());

    let input_dim = 4;
    let max_batch = 8;
    let mut base = MlpBuilder::new(input_dim)
        .unwrap()
        .hidden(8, 8)
        .unwrap()
        .max_batch(max_batch)
        .unwrap()
        .build_with_seed(0)
        .unwrap();

    // Narrow every scratch buffer and cache before cloning.
    let x_narrow = column_batch(input_dim, 2, 0.5);
    let y_narrow = column_batch(1, 2, 0.0);
    base.train_step(&x_narrow, &y_narrow, 0.1).unwrap();

    let fresh = Mlp::new_with_seed(input_dim, 8, 8, max_batch, 0).unwrap();
    let mut narrowed = base.clone();
    let mut untouched = fresh.clone();

    let x_full = column_batch(input_dim, max_batch, 0.2);
    let y_full = column_batch(1, max_batch, 1.0);

    for (name, mlp) in [("narrowed", &mut narrowed), ("untouched", &mut untouched)] {
        ALLOC.reset();
        mlp.train_step(&x_full, &y_full, 0.1).unwrap();
        let events = ALLOC.alloc_events();
        assert_eq!(events, 0, "first train_step on {name} clone allocated {events} times");
    }

}
