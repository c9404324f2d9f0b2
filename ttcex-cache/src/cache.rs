use lazy_static::lazy_static;
pub use string_cache::DefaultAtom as Atom;

lazy_static! {
    /// Unit bounding sizes of the engine's primitive meshes.
    static ref BUILTIN_PREFABS: Vec<(Atom, [f32; 3])> = vec![
        (Atom::from("Cube"), [1.0, 1.0, 1.0]),
        (Atom::from("Sphere"), [1.0, 1.0, 1.0]),
        (Atom::from("Capsule"), [1.0, 2.0, 1.0]),
        (Atom::from("Cylinder"), [1.0, 2.0, 1.0]),
        (Atom::from("Plane"), [10.0, 0.0, 10.0]),
        (Atom::from("Quad"), [1.0, 1.0, 0.0]),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrefabId(usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Prefab {
    pub name: Atom,
    /// Bounding size at scale 1.
    pub extents: [f32; 3],
}

impl Prefab {
    /// Bounding size once the object's scale is applied.
    pub fn bounds(&self, scale: [f32; 3]) -> [f32; 3] {
        [
            self.extents[0] * scale[0].abs(),
            self.extents[1] * scale[1].abs(),
            self.extents[2] * scale[2].abs(),
        ]
    }
}

/// Object types that trial files may reference, keyed by interned name.
#[derive(Debug, Clone, Default)]
pub struct PrefabRegistry {
    entries: Vec<Prefab>,
}

impl PrefabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, extents) in BUILTIN_PREFABS.iter() {
            registry.register(name, *extents);
        }
        registry
    }

    /// Registers or replaces a prefab and returns its id.
    pub fn register(&mut self, name: &str, extents: [f32; 3]) -> PrefabId {
        let atom = Atom::from(name);
        match self.entries.iter().position(|p| p.name == atom) {
            Some(idx) => {
                self.entries[idx].extents = extents;
                PrefabId(idx)
            }
            None => {
                self.entries.push(Prefab {
                    name: atom,
                    extents,
                });
                PrefabId(self.entries.len() - 1)
            }
        }
    }

    pub fn resolve(&self, name: &str) -> Option<PrefabId> {
        let atom = Atom::from(name);
        self.entries.iter().position(|p| p.name == atom).map(PrefabId)
    }

    pub fn get(&self, id: PrefabId) -> Option<&Prefab> {
        self.entries.get(id.0)
    }

    pub fn lookup(&self, name: &str) -> Option<&Prefab> {
        self.resolve(name).and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|p| &*p.name)
    }
}
