//! # Tick Barrier Verification Tests
//!
//! End-to-end checks of the world scheduler:
//!
//! 1. **Deferred structure**: adds and removals reach systems at the next tick
//! 2. **Immediate values**: in-place writes are seen by later systems
//! 3. **Membership**: systems hold exactly the entities matching their signature
//! 4. **Lifecycle**: misuse is reported as an error
//!
//! Run with: cargo test --test tick_barrier

use mengine_core::{
    Component, EcsError, EcsResult, EntityId, InitSystem, Signature, System, UpdateState, World,
    WorldConfig, WorldState,
};

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
struct Player {
    x: i32,
    y: i32,
}
impl Component for Player {}

#[derive(Debug, Clone, PartialEq)]
struct Inventory {
    food: u32,
}
impl Component for Inventory {}

#[derive(Debug, Clone, PartialEq)]
struct Tag;
impl Component for Tag {}

#[allow(dead_code)]
#[derive(Debug)]
struct Unregistered;
impl Component for Unregistered {}

/// Lines "printed" by systems during a run.
#[derive(Default)]
struct Output(Vec<String>);

fn output(world: &World) -> Vec<String> {
    world.singleton::<Output>().unwrap().0.clone()
}

fn world() -> World {
    let mut world = World::new();
    world.register_component::<Player>().unwrap();
    world.register_component::<Inventory>().unwrap();
    world.register_component::<Tag>().unwrap();
    world.register_singleton(Output::default());
    world
}

fn sig<C: Component>(world: &World) -> Signature {
    world.signature_of::<C>().unwrap()
}

fn sorted(entities: &[EntityId]) -> Vec<EntityId> {
    let mut v = entities.to_vec();
    v.sort_unstable();
    v
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn player_debug_dump_after_init() {
    let mut world = world();
    let e = world.create_entity();
    world.add_component(e, Player { x: 200, y: 400 }).unwrap();
    world.init().unwrap();

    assert_eq!(world.debug_component::<Player>(e).unwrap(), "{x:200 y:400}");
}

#[test]
fn removed_inventory_is_absent_player_intact() {
    let mut world = world();
    let e = world.create_entity();
    world.add_component(e, Player { x: 200, y: 400 }).unwrap();
    world.add_component(e, Inventory { food: 2 }).unwrap();
    world.init().unwrap();

    world.remove_component::<Inventory>(e).unwrap();

    assert!(world.get_component::<Inventory>(e).unwrap().is_none());
    assert_eq!(world.debug_component::<Player>(e).unwrap(), "{x:200 y:400}");
    assert_eq!(world.debug_component::<Inventory>(e).unwrap(), "<none>");
}

struct GiveFood;

impl System for GiveFood {
    fn update(&mut self, state: UpdateState<'_>) -> EcsResult<()> {
        for &e in state.entities {
            if !state.world.has_component::<Inventory>(e)? {
                state.world.add_component(e, Inventory { food: 10 })?;
            }
        }
        Ok(())
    }
}

struct PrintPlayers;

impl System for PrintPlayers {
    fn update(&mut self, state: UpdateState<'_>) -> EcsResult<()> {
        for &e in state.entities {
            let line = format!(
                "Player:{} Inventory:{}",
                state.world.debug_component::<Player>(e)?,
                state.world.debug_component::<Inventory>(e)?
            );
            state.world.singleton_mut::<Output>()?.0.push(line);
        }
        Ok(())
    }
}

#[test]
fn second_system_sees_added_inventory_one_tick_later() {
    let mut world = world();
    let player = sig::<Player>(&world);
    let inventory = sig::<Inventory>(&world);
    world.register_system(GiveFood, player).unwrap();
    world.register_system(PrintPlayers, player | inventory).unwrap();

    let e = world.create_entity();
    world.add_component(e, Player { x: 200, y: 400 }).unwrap();
    world.init().unwrap();

    world.run_update(0.016).unwrap();
    assert!(output(&world).is_empty());

    world.run_update(0.016).unwrap();
    assert_eq!(output(&world), vec!["Player:{x:200 y:400} Inventory:{food:10}"]);

    world.run_update(0.016).unwrap();
    assert_eq!(output(&world).len(), 2);
    assert_eq!(world.must_get_component::<Inventory>(e).unwrap().food, 10);
}

// ============================================================================
// TESTABLE PROPERTIES
// ============================================================================

#[test]
fn added_component_is_deferred_but_exists() {
    let mut world = world();
    world.init().unwrap();

    let e = world.create_entity();
    world.add_component(e, Tag).unwrap();
    assert!(world.get_component::<Tag>(e).unwrap().is_none());
    assert!(world.has_component::<Tag>(e).unwrap());
    assert!(world.must_get_component::<Tag>(e).is_err());

    world.run_update(0.0).unwrap();
    assert_eq!(world.get_component::<Tag>(e).unwrap(), Some(&Tag));
}

#[test]
fn pending_removal_exists_but_is_not_fetchable() {
    let mut world = world();
    let e = world.create_entity();
    world.add_component(e, Inventory { food: 2 }).unwrap();
    world.init().unwrap();

    world.remove_component::<Inventory>(e).unwrap();
    assert!(world.has_component::<Inventory>(e).unwrap());
    assert!(world.get_component::<Inventory>(e).unwrap().is_none());

    world.run_update(0.0).unwrap();
    assert!(!world.has_component::<Inventory>(e).unwrap());
}

struct Walk;

impl System for Walk {
    fn update(&mut self, state: UpdateState<'_>) -> EcsResult<()> {
        for &e in state.entities {
            state.world.must_get_component_mut::<Player>(e)?.x += 1;
        }
        Ok(())
    }
}

struct Observe;

impl System for Observe {
    fn update(&mut self, state: UpdateState<'_>) -> EcsResult<()> {
        for &e in state.entities {
            let x = state.world.must_get_component::<Player>(e)?.x;
            state.world.singleton_mut::<Output>()?.0.push(x.to_string());
        }
        Ok(())
    }
}

#[test]
fn value_writes_are_visible_within_the_tick() {
    let mut world = world();
    let player = sig::<Player>(&world);
    world.register_system(Walk, player).unwrap();
    world.register_system(Observe, player).unwrap();

    let e = world.create_entity();
    world.add_component(e, Player { x: 0, y: 0 }).unwrap();
    world.init().unwrap();

    world.run_update(0.0).unwrap();
    world.run_update(0.0).unwrap();
    assert_eq!(output(&world), vec!["1", "2"]);
}

struct DropInventory;

impl System for DropInventory {
    fn update(&mut self, state: UpdateState<'_>) -> EcsResult<()> {
        for &e in state.entities {
            if state.world.get_component::<Inventory>(e)?.is_some() {
                state.world.remove_component::<Inventory>(e)?;
            }
        }
        Ok(())
    }
}

struct CountCarriers;

impl System for CountCarriers {
    fn update(&mut self, state: UpdateState<'_>) -> EcsResult<()> {
        let line = format!("carriers:{}", state.entities.len());
        state.world.singleton_mut::<Output>()?.0.push(line);
        Ok(())
    }
}

#[test]
fn membership_is_frozen_for_the_running_tick() {
    let mut world = world();
    let player = sig::<Player>(&world);
    let inventory = sig::<Inventory>(&world);
    world.register_system(DropInventory, player).unwrap();
    world.register_system(CountCarriers, player | inventory).unwrap();

    let e = world.create_entity();
    world.add_component(e, Player { x: 0, y: 0 }).unwrap();
    world.add_component(e, Inventory { food: 1 }).unwrap();
    world.init().unwrap();

    world.run_update(0.0).unwrap();
    world.run_update(0.0).unwrap();
    assert_eq!(output(&world), vec!["carriers:1", "carriers:0"]);
    assert_eq!(world.system_entities::<DropInventory>().unwrap(), &[e]);
}

struct Idle<const N: usize>;

impl<const N: usize> System for Idle<N> {
    fn update(&mut self, _state: UpdateState<'_>) -> EcsResult<()> {
        Ok(())
    }
}

#[test]
fn systems_hold_exactly_matching_entities() {
    let mut world = world();
    let p = sig::<Player>(&world);
    let i = sig::<Inventory>(&world);
    let t = sig::<Tag>(&world);
    world.register_system(Idle::<0>, p).unwrap();
    world.register_system(Idle::<1>, p | i).unwrap();
    world.register_system(Idle::<2>, i | t).unwrap();

    let a = world.create_entity();
    let b = world.create_entity();
    let c = world.create_entity();
    world.add_component(a, Player { x: 0, y: 0 }).unwrap();
    world.add_component(b, Player { x: 0, y: 0 }).unwrap();
    world.add_component(b, Inventory { food: 0 }).unwrap();
    world.add_component(c, Inventory { food: 0 }).unwrap();
    world.add_component(c, Tag).unwrap();

    assert!(world.system_entities::<Idle<0>>().unwrap().is_empty());
    world.init().unwrap();

    assert_eq!(sorted(world.system_entities::<Idle<0>>().unwrap()), vec![a, b]);
    assert_eq!(world.system_entities::<Idle<1>>().unwrap(), &[b]);
    assert_eq!(world.system_entities::<Idle<2>>().unwrap(), &[c]);

    world.remove_component::<Inventory>(b).unwrap();
    world.run_update(0.0).unwrap();

    assert_eq!(sorted(world.system_entities::<Idle<0>>().unwrap()), vec![a, b]);
    assert!(world.system_entities::<Idle<1>>().unwrap().is_empty());
    assert_eq!(world.entity_signature(b), p);
}

#[test]
fn late_registered_system_is_seeded() {
    let mut world = world();
    let e = world.create_entity();
    world.add_component(e, Tag).unwrap();
    world.init().unwrap();

    let t = sig::<Tag>(&world);
    world.register_system(Idle::<3>, t).unwrap();
    assert_eq!(world.system_entities::<Idle<3>>().unwrap(), &[e]);

    world.run_update(0.0).unwrap();
    assert_eq!(world.system_entities::<Idle<3>>().unwrap(), &[e]);
}

#[test]
fn entity_ids_are_never_reused() {
    let mut world = world();
    let first = world.create_entity();
    world.remove_entity(first).unwrap();
    world.init().unwrap();

    let second = world.create_entity();
    assert_ne!(first, second);
}

#[test]
fn removing_entity_with_subset_of_components() {
    let mut world = world();
    let p = sig::<Player>(&world);
    world.register_system(Idle::<4>, p).unwrap();

    let e = world.create_entity();
    world.add_component(e, Player { x: 1, y: 1 }).unwrap();
    world.init().unwrap();
    assert_eq!(world.system_entities::<Idle<4>>().unwrap(), &[e]);

    world.remove_entity(e).unwrap();
    world.run_update(0.0).unwrap();

    assert!(world.system_entities::<Idle<4>>().unwrap().is_empty());
    assert!(!world.has_component::<Player>(e).unwrap());
    assert!(!world.has_component::<Inventory>(e).unwrap());
    assert_eq!(world.debug_entity(e), "");
}

#[test]
fn removed_entity_leaves_empty_signature_system() {
    let mut world = world();
    world.register_system(Idle::<8>, Signature::EMPTY).unwrap();
    assert_eq!(world.system_signature::<Idle<8>>().unwrap(), Signature::EMPTY);

    let gone = world.create_entity();
    let kept = world.create_entity();
    world.add_component(gone, Tag).unwrap();
    world.add_component(kept, Tag).unwrap();
    world.init().unwrap();
    assert_eq!(sorted(world.system_entities::<Idle<8>>().unwrap()), vec![gone, kept]);

    world.remove_entity(gone).unwrap();
    world.run_update(0.0).unwrap();
    world.run_update(0.0).unwrap();

    assert_eq!(world.system_entities::<Idle<8>>().unwrap(), &[kept]);
}

#[test]
fn component_removal_keeps_empty_signature_membership() {
    let mut world = world();
    world.register_system(Idle::<9>, Signature::EMPTY).unwrap();

    let e = world.create_entity();
    world.add_component(e, Tag).unwrap();
    world.init().unwrap();

    world.remove_component::<Tag>(e).unwrap();
    world.run_update(0.0).unwrap();

    assert_eq!(world.system_entities::<Idle<9>>().unwrap(), &[e]);
    assert!(world.entity_signature(e).is_empty());
}

#[test]
fn readding_after_entity_removal_keeps_new_membership() {
    let mut world = world();
    let t = sig::<Tag>(&world);
    world.register_system(Idle::<5>, t).unwrap();

    let e = world.create_entity();
    world.add_component(e, Player { x: 0, y: 0 }).unwrap();
    world.init().unwrap();

    world.remove_entity(e).unwrap();
    world.add_component(e, Tag).unwrap();
    world.run_update(0.0).unwrap();

    assert_eq!(world.system_entities::<Idle<5>>().unwrap(), &[e]);
    assert_eq!(world.entity_signature(e), t);
}

#[test]
fn debug_entity_lists_components_in_registration_order() {
    let mut world = world();
    let e = world.create_entity();
    world.add_component(e, Inventory { food: 3 }).unwrap();
    world.add_component(e, Player { x: 1, y: 2 }).unwrap();
    world.init().unwrap();

    assert_eq!(world.debug_entity(e), "{x:1 y:2}\n{food:3}");
}

#[test]
fn debug_entity_marks_pending_components() {
    let mut world = world();
    let e = world.create_entity();
    world.add_component(e, Player { x: 1, y: 2 }).unwrap();
    world.add_component(e, Inventory { food: 3 }).unwrap();
    world.init().unwrap();

    world.remove_component::<Player>(e).unwrap();
    world.add_component(e, Tag).unwrap();
    assert_eq!(world.debug_entity(e), "<none>\n{food:3}\n<none>");

    world.run_update(0.0).unwrap();
    assert_eq!(world.debug_entity(e), "{food:3}\nTag");
}

#[test]
fn compaction_reclaims_removed_entities() {
    let config = WorldConfig::from_toml_str("initial_capacity = 4\ncompaction_ratio = 0.5\n").unwrap();
    let mut world = World::with_config(config).unwrap();
    assert_eq!(world.config().initial_capacity, 4);
    world.register_component::<Player>().unwrap();

    let entities: Vec<EntityId> = (0..10).map(|_| world.create_entity()).collect();
    for (i, &e) in entities.iter().enumerate() {
        let x = i32::try_from(i).unwrap();
        world.add_component(e, Player { x, y: 0 }).unwrap();
    }
    world.init().unwrap();
    assert_eq!(world.storage::<Player>().unwrap().capacity(), 16);

    for &e in &entities[..9] {
        world.remove_entity(e).unwrap();
    }
    world.run_update(0.0).unwrap();

    let storage = world.storage::<Player>().unwrap();
    assert_eq!(storage.dead_count(), 0);
    assert_eq!(storage.len(), 1);
    assert_eq!(
        world.get_component::<Player>(entities[9]).unwrap(),
        Some(&Player { x: 9, y: 0 })
    );
}

// ============================================================================
// LIFECYCLE AND FAILURES
// ============================================================================

struct Spawner;

impl InitSystem for Spawner {
    fn init(&mut self, world: &mut World) -> EcsResult<()> {
        let e = world.create_entity();
        world.add_component(e, Player { x: 200, y: 400 })?;
        world.singleton_mut::<Output>()?.0.push(format!("spawned {e}"));
        Ok(())
    }
}

#[test]
fn init_systems_run_once_and_changes_land_next_tick() {
    let mut world = world();
    let p = sig::<Player>(&world);
    world.register_init_system(Spawner);
    world.register_system(Idle::<6>, p).unwrap();
    world.init().unwrap();

    assert_eq!(output(&world).len(), 1);
    assert!(world.system_entities::<Idle<6>>().unwrap().is_empty());
    assert_eq!(world.pending_operations(), 1);

    world.run_update(0.0).unwrap();
    world.run_update(0.0).unwrap();
    assert_eq!(output(&world).len(), 1);
    assert_eq!(world.system_entities::<Idle<6>>().unwrap().len(), 1);
}

#[test]
fn contract_violations_are_errors() {
    let mut world = world();
    let e = world.create_entity();

    world.add_component(e, Tag).unwrap();
    assert!(matches!(
        world.add_component(e, Tag),
        Err(EcsError::DuplicateComponent { .. })
    ));
    assert!(matches!(
        world.remove_component::<Inventory>(e),
        Err(EcsError::MissingComponent { .. })
    ));
    assert!(matches!(
        world.register_component::<Tag>(),
        Err(EcsError::ComponentAlreadyRegistered(_))
    ));
    assert!(matches!(
        world.get_component::<Unregistered>(e),
        Err(EcsError::ComponentNotRegistered(_))
    ));
    assert!(!world.has_singleton::<String>());
    assert!(matches!(
        world.singleton::<String>(),
        Err(EcsError::SingletonNotRegistered(_))
    ));

    world.register_system(Idle::<7>, Signature::EMPTY).unwrap();
    assert!(matches!(
        world.register_system(Idle::<7>, Signature::EMPTY),
        Err(EcsError::SystemAlreadyRegistered(_))
    ));
}

#[test]
fn lifecycle_states() {
    let mut world = world();
    assert_eq!(world.state(), WorldState::Uninitialized);
    assert_eq!(world.run_update(0.0), Err(EcsError::NotInitialized));

    world.init().unwrap();
    assert_eq!(world.state(), WorldState::Initialized);
    assert_eq!(world.init(), Err(EcsError::AlreadyInitialized));
}

#[allow(dead_code)]
struct Bit<const N: usize>;

impl<const N: usize> Component for Bit<N> {}

impl<const N: usize> std::fmt::Debug for Bit<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bit{N}")
    }
}

macro_rules! register_bits {
    ($world:expr; $($n:literal)*) => {
        $( $world.register_component::<Bit<$n>>().unwrap(); )*
    };
}

#[test]
fn sixty_fifth_component_type_is_rejected() {
    let mut world = World::new();
    register_bits!(world; 0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16 17 18 19 20 21 22 23 24 25 26 27 28 29 30 31 32 33 34 35 36 37 38 39 40 41 42 43 44 45 46 47 48 49 50 51 52 53 54 55 56 57 58 59 60 61 62 63);

    assert!(matches!(
        world.register_component::<Player>(),
        Err(EcsError::SignatureExhausted { limit: 64, .. })
    ));
}
