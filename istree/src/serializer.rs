//! The engine: orchestrates publisher <-> IST <-> stream, per base spec
//! §4.G.

use crate::codec::Format;
use crate::descriptor::PublicationShape;
use crate::error::{Error, Result};
use crate::node::{Ist, NodeId, SerNodeInfo};
use crate::publisher::{
    ObjectSlotMut, ObjectView, Publisher, WantDescriptorCallback, WantObjectCallback,
    WantObjectOutcome, WantReason,
};
use crate::registry::ReferenceRegistry;
use crate::rtti::{Kind, Rtti};
use crate::stream::Stream;
use crate::value::Value;

/// The engine's current activity. The cursor notion from the base spec
/// collapses here into the recursion stack of whichever walk is in
/// progress; callers only ever observe [`Self`] between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    StoringSequential,
    StoringBulk,
    Loading,
    IstOnly,
}

const ROOT_NAME: &str = "root";

/// Orchestrates the walk between a live [`Publisher`] graph, the in-memory
/// [`Ist`], and a [`Stream`] (base spec §4.G).
///
/// A [`ReferenceRegistry`] is never owned by a `Serializer`; it is an
/// ordinary value the caller passes to whichever call needs it, matching the
/// "explicit context" option the base design allows in place of a true
/// process-wide global.
#[derive(Default)]
pub struct Serializer {
    ist: Ist,
    state: EngineState,
}

impl Default for EngineState {
    fn default() -> Self {
        Self::Idle
    }
}

impl Serializer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    #[must_use]
    pub fn ist(&self) -> &Ist {
        &self.ist
    }

    pub fn reset(&mut self) {
        self.ist.clear();
        self.state = EngineState::Idle;
    }

    // ---- store paths ----------------------------------------------------

    /// Sequential store: builds the IST from `root` and writes each node to
    /// `stream` as it is discovered.
    pub fn publisher_to_stream(
        &mut self,
        root: &dyn Publisher,
        stream: &mut dyn Stream,
        format: Format,
    ) -> Result<()> {
        self.state = EngineState::StoringSequential;
        self.ist.clear();
        let codec = format.codec();
        let result = build_from_publisher(&mut self.ist, root, &mut |node| codec.write(node, stream));
        self.ist.recompute_last_child_flags();
        self.state = EngineState::Idle;
        result
    }

    /// Builds the IST from `root` without touching any stream.
    pub fn publisher_to_ist(&mut self, root: &dyn Publisher) -> Result<()> {
        self.state = EngineState::IstOnly;
        self.ist.clear();
        let result = build_from_publisher(&mut self.ist, root, &mut |_| Ok(()));
        self.ist.recompute_last_child_flags();
        self.state = EngineState::Idle;
        result
    }

    /// Bulk store: writes the already-built IST out in preorder. Enables
    /// format conversion together with [`Self::stream_to_ist`].
    pub fn ist_to_stream(&mut self, stream: &mut dyn Stream, format: Format) -> Result<()> {
        self.state = EngineState::StoringBulk;
        let codec = format.codec();
        let result = (|| {
            for id in self.ist.preorder() {
                codec.write(self.ist.info(id), stream)?;
            }
            Ok(())
        })();
        self.state = EngineState::Idle;
        result
    }

    // ---- load paths -------------------------------------------------------

    /// Pure parse: reads every node off `stream` and rebuilds the IST's
    /// shape, without touching any publisher.
    pub fn stream_to_ist(&mut self, stream: &mut dyn Stream, format: Format) -> Result<()> {
        self.state = EngineState::Loading;
        let codec = format.codec();
        let mut nodes = Vec::new();
        let result = (|| {
            while let Some(node) = codec.read(stream)? {
                nodes.push(node);
            }
            Ok(())
        })();
        self.ist = Ist::from_preorder(nodes);
        self.state = EngineState::Idle;
        result
    }

    /// Drives `target` from the already-built IST.
    pub fn ist_to_publisher(
        &mut self,
        target: &mut dyn Publisher,
        registry: &ReferenceRegistry,
        on_want_descriptor: &mut WantDescriptorCallback<'_>,
        on_want_object: &mut WantObjectCallback<'_>,
    ) -> Result<()> {
        self.state = EngineState::Loading;
        let result = match self.ist.root() {
            Some(root) => restore_children(
                &self.ist,
                root,
                target,
                registry,
                on_want_descriptor,
                on_want_object,
            ),
            None => Ok(()),
        };
        self.state = EngineState::Idle;
        result
    }

    /// `stream_to_ist` followed by `ist_to_publisher`.
    pub fn stream_to_publisher(
        &mut self,
        stream: &mut dyn Stream,
        target: &mut dyn Publisher,
        format: Format,
        registry: &ReferenceRegistry,
        on_want_descriptor: &mut WantDescriptorCallback<'_>,
        on_want_object: &mut WantObjectCallback<'_>,
    ) -> Result<()> {
        self.stream_to_ist(stream, format)?;
        self.ist_to_publisher(target, registry, on_want_descriptor, on_want_object)
    }

    // ---- random access ------------------------------------------------

    /// Walks a dotted path rooted at the tree's root name.
    #[must_use]
    pub fn find_node(&self, chain: &str) -> Option<NodeId> {
        self.ist.find_node(chain)
    }

    /// Validates RTTI and applies a single node's bytes to the matching
    /// publication on `target`, without touching anything else. Returns
    /// `false` if there is no matching, same-shaped, same-RTTI publication.
    pub fn restore_property(&self, id: NodeId, target: &mut dyn Publisher) -> Result<bool> {
        let info = self.ist.info(id);
        let Some(descriptor) = target.publication_by_name(&info.name) else {
            return Ok(false);
        };
        if descriptor.rtti != info.rtti || descriptor.shape == PublicationShape::Object {
            return Ok(false);
        }

        let value = Value::from_host_bytes(info.rtti, &info.value)?;
        target.write_value(&info.name, value)?;
        Ok(true)
    }

    /// The dotted identifier chain of every node currently flagged
    /// `is_damaged`.
    #[must_use]
    pub fn damage(&self) -> Vec<String> {
        self.ist
            .preorder()
            .into_iter()
            .filter(|&id| self.ist.info(id).is_damaged)
            .map(|id| self.ist.identifier_chain(id))
            .collect()
    }
}

fn build_from_publisher(
    ist: &mut Ist,
    root: &dyn Publisher,
    write: &mut dyn FnMut(&SerNodeInfo) -> Result<()>,
) -> Result<()> {
    let root_node = SerNodeInfo::new(
        Rtti::scalar(Kind::Object),
        0,
        ROOT_NAME,
        root.class_name().as_bytes().to_vec(),
    );
    write(&root_node)?;
    let root_id = ist.push(None, root_node);
    add_publisher(ist, root_id, 1, root, write)
}

fn add_publisher(
    ist: &mut Ist,
    parent: NodeId,
    level: u32,
    publisher: &dyn Publisher,
    write: &mut dyn FnMut(&SerNodeInfo) -> Result<()>,
) -> Result<()> {
    for i in 0..publisher.publication_count() {
        let descriptor = publisher
            .publication_at(i)
            .ok_or_else(|| Error::custom(format!("publication {i} vanished mid-walk")))?;

        if descriptor.shape == PublicationShape::Object {
            match publisher.read_object(i) {
                Some(ObjectView::Owned(sub)) => {
                    let node = SerNodeInfo::new(
                        Rtti::scalar(Kind::Object),
                        level,
                        descriptor.name,
                        sub.class_name().as_bytes().to_vec(),
                    );
                    write(&node)?;
                    let id = ist.push(Some(parent), node);
                    add_publisher(ist, id, level + 1, sub, write)?;
                },
                Some(ObjectView::Reference { id, .. }) => {
                    let node = SerNodeInfo::new(
                        Rtti::scalar(Kind::Object),
                        level,
                        descriptor.name,
                        id.unwrap_or("").as_bytes().to_vec(),
                    );
                    write(&node)?;
                    ist.push(Some(parent), node);
                },
                None => {
                    let node =
                        SerNodeInfo::new(Rtti::scalar(Kind::Object), level, descriptor.name, Vec::new());
                    write(&node)?;
                    ist.push(Some(parent), node);
                },
            }
        } else {
            let value = publisher.read_value(i).ok_or_else(|| {
                Error::custom(format!("publication {} declared a value shape but returned none", descriptor.name))
            })?;
            let node = SerNodeInfo::new(value.rtti(), level, descriptor.name, value.to_host_bytes());
            write(&node)?;
            ist.push(Some(parent), node);
        }
    }
    Ok(())
}

fn restore_children(
    ist: &Ist,
    parent: NodeId,
    target: &mut dyn Publisher,
    registry: &ReferenceRegistry,
    on_want_descriptor: &mut WantDescriptorCallback<'_>,
    on_want_object: &mut WantObjectCallback<'_>,
) -> Result<()> {
    for &child in ist.children(parent) {
        let info = ist.info(child).clone();
        if info.is_damaged {
            continue;
        }

        match target.publication_by_name(&info.name) {
            Some(descriptor) if descriptor.rtti == info.rtti => {
                if descriptor.shape == PublicationShape::Object {
                    restore_object(ist, child, &info, target, registry, on_want_descriptor, on_want_object)?;
                } else {
                    apply_value(target, &info)?;
                }
            },
            Some(_) => {
                if let Some(replacement) = on_want_descriptor(&info, WantReason::RttiMismatch) {
                    apply_via_descriptor(target, &info, &replacement)?;
                }
            },
            None => {
                if let Some(replacement) = on_want_descriptor(&info, WantReason::UnknownProperty) {
                    apply_via_descriptor(target, &info, &replacement)?;
                }
            },
        }
    }
    Ok(())
}

fn restore_object(
    ist: &Ist,
    node_id: NodeId,
    info: &SerNodeInfo,
    target: &mut dyn Publisher,
    registry: &ReferenceRegistry,
    on_want_descriptor: &mut WantDescriptorCallback<'_>,
    on_want_object: &mut WantObjectCallback<'_>,
) -> Result<()> {
    let Some(slot) = target.object_mut(&info.name) else {
        return Ok(());
    };

    match slot {
        ObjectSlotMut::Owned(sub) => {
            if !ist.children(node_id).is_empty() {
                restore_children(ist, node_id, sub, registry, on_want_descriptor, on_want_object)?;
            }
        },
        ObjectSlotMut::Reference(slot) => {
            if slot.is_bound() {
                return Ok(());
            }

            let wire_id = String::from_utf8_lossy(&info.value).into_owned();
            let resolved = (!wire_id.is_empty())
                .then(|| registry.lookup_by_id_any(slot.type_name(), &wire_id))
                .flatten();

            if let Some(any) = resolved {
                slot.bind_any(any, wire_id);
            } else if !ist.children(node_id).is_empty() {
                // shape says owned-like but slot is a reference; nothing
                // sound to do without a matching registry entry.
            } else {
                match on_want_object(info, slot) {
                    WantObjectOutcome::ResolveReference(other_id) => {
                        if let Some(any) = registry.lookup_by_id_any(slot.type_name(), &other_id) {
                            slot.bind_any(any, other_id);
                        }
                    },
                    WantObjectOutcome::Handled | WantObjectOutcome::Skip => {},
                }
            }
        },
    }
    Ok(())
}

fn apply_value(target: &mut dyn Publisher, info: &SerNodeInfo) -> Result<()> {
    let value = Value::from_host_bytes(info.rtti, &info.value)?;
    target.write_value(&info.name, value)?;
    Ok(())
}

fn apply_via_descriptor(
    target: &mut dyn Publisher,
    info: &SerNodeInfo,
    descriptor: &crate::descriptor::Descriptor,
) -> Result<()> {
    if descriptor.shape == PublicationShape::Object {
        return Ok(());
    }
    let value = Value::from_host_bytes(descriptor.rtti, &info.value)?;
    target.write_value(&descriptor.name, value)?;
    Ok(())
}
