use std::any::TypeId;
use std::cell::Cell;
use std::rc::Rc;

use nalgebra::{dmatrix, DMatrix, DVector};
use revarena::{
    arena_chainable, arena_passthrough, Arena, ArenaBox, ArenaMatrix, ArenaResident, ArenaSeq, ArenaSlice, ArenaT,
    ArenaType,
};

fn same<A: 'static, B: 'static>() -> bool {
    TypeId::of::<A>() == TypeId::of::<B>()
}

fn resident<T: ArenaResident>() -> bool {
    true
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Knot {
    t: f64,
    w: f64,
}

arena_passthrough!(Knot);

struct DropProbe {
    drops: Rc<Cell<usize>>,
}

impl Drop for DropProbe {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

arena_chainable!(DropProbe);

// ── Compile-time mapping ──

#[test]
fn scalars_map_to_themselves() {
    assert!(same::<ArenaT<f64, f64>, f64>());
    assert!(same::<ArenaT<f64, i32>, i32>());
    assert!(same::<ArenaT<f32, bool>, bool>());
    assert!(same::<ArenaT<f64, Knot>, Knot>());
}

#[test]
fn resident_types_map_to_themselves() {
    assert!(same::<ArenaT<f64, ArenaMatrix<f64>>, ArenaMatrix<f64>>());
    assert!(same::<ArenaT<f64, ArenaSlice<f64>>, ArenaSlice<f64>>());
    assert!(same::<ArenaT<f64, ArenaSeq<f64>>, ArenaSeq<f64>>());
}

#[test]
fn containers_map_recursively() {
    assert!(same::<ArenaT<f64, DMatrix<f64>>, ArenaMatrix<f64>>());
    assert!(same::<ArenaT<f64, DVector<f64>>, ArenaMatrix<f64>>());
    assert!(same::<ArenaT<f64, Vec<f64>>, ArenaSeq<f64>>());
    assert!(same::<ArenaT<f64, Vec<Vec<i32>>>, ArenaSeq<ArenaSeq<i32>>>());
    assert!(same::<ArenaT<f64, Vec<DMatrix<f64>>>, ArenaSeq<ArenaMatrix<f64>>>());
    assert!(same::<ArenaT<f64, DropProbe>, ArenaBox<DropProbe>>());
}

#[test]
fn every_representation_is_resident() {
    assert!(resident::<ArenaT<f64, Knot>>());
    assert!(resident::<ArenaT<f64, u8>>());
    assert!(resident::<ArenaT<f64, DropProbe>>());
    assert!(resident::<ArenaT<f64, Vec<Vec<DMatrix<f64>>>>>());
    assert!(resident::<ArenaT<f32, ArenaBox<DropProbe>>>());
}

// ── Runtime behaviour ──

#[test]
fn matrix_round_trips_through_the_arena() {
    let mut arena: Arena<f64> = Arena::new();
    let m = dmatrix![1.0, 2.0, 3.0; 4.0, 5.0, 6.0];
    let h = m.clone().into_arena(&mut arena);
    assert_eq!(h.shape(), (2, 3));
    assert_eq!(h.view(&arena)[(1, 2)], 6.0);
    assert_eq!(h.to_matrix(&arena), m);

    h.view_mut(&mut arena)[(0, 0)] = -1.0;
    assert_eq!(h.to_matrix(&arena)[(0, 0)], -1.0);
}

#[test]
fn nested_sequences_keep_their_elements() {
    let mut arena: Arena<f64> = Arena::new();
    let seq = vec![vec![1_i32, 2], vec![], vec![3]].into_arena(&mut arena);
    assert_eq!(seq.len(), 3);
    let inner = seq.get(&arena, 0);
    assert_eq!(inner.as_slice(&arena), &[1, 2]);
    assert!(seq.get(&arena, 1).is_empty());
    assert_eq!(seq.get(&arena, 2).as_slice(&arena), &[3]);
}

#[test]
fn sequence_of_matrices() {
    let mut arena: Arena<f64> = Arena::new();
    let seq = vec![DMatrix::<f64>::identity(2, 2), DMatrix::from_element(1, 3, 7.0)].into_arena(&mut arena);
    let second = seq.get(&arena, 1);
    assert_eq!(second.shape(), (1, 3));
    assert_eq!(arena.slice(second.data()), &[7.0, 7.0, 7.0]);
}

#[test]
fn chainable_values_are_dropped_exactly_once_at_reset() {
    let drops = Rc::new(Cell::new(0));
    let mut arena: Arena<f64> = Arena::new();
    let boxed = DropProbe {
        drops: Rc::clone(&drops),
    }
    .into_arena(&mut arena);
    let _copy = boxed;
    assert_eq!(drops.get(), 0);
    assert_eq!(Rc::strong_count(&arena.object(boxed).drops), 2);

    arena.reset();
    assert_eq!(drops.get(), 1);
    arena.reset();
    assert_eq!(drops.get(), 1);
}

#[test]
fn passthrough_copies_the_value() {
    let mut arena: Arena<f64> = Arena::new();
    let k = Knot { t: 0.5, w: 2.0 };
    assert_eq!(k.into_arena(&mut arena), k);
    assert_eq!(arena.live_allocations(), 0);
}
