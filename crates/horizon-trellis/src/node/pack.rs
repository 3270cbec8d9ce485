//! Pack slots for start/end-grouped containers.
//!
//! Header and action bars place children in a start group or an end group
//! with no finer ordering. The `Pack.Start` / `Pack.End` virtual elements
//! route their child widget into the corresponding group of the enclosing
//! pack container.

use std::any::Any;

use horizon_trellis_core::NativeHandle;

use crate::container::PackContainer;
use crate::error::{Error, Result};
use crate::node::{CommitContext, CreateContext, Node, NodeBase};
use crate::props::Props;

/// Which group a pack slot routes into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PackPosition {
    Start,
    End,
}

/// Virtual element routing one child widget into a pack group.
pub struct PackSlotNode {
    base: NodeBase,
    position: PackPosition,
    child: Option<NativeHandle>,
    attached: bool,
}

impl PackSlotNode {
    /// Element type of the start-group slot.
    pub const TYPE_START: &'static str = "Pack.Start";
    /// Element type of the end-group slot.
    pub const TYPE_END: &'static str = "Pack.End";

    /// Whether `type_name` names a pack slot.
    pub fn matches(type_name: &str) -> bool {
        type_name == Self::TYPE_START || type_name == Self::TYPE_END
    }

    /// Create a slot for the given element type.
    pub fn new(ctx: &CreateContext<'_>, type_name: &str, props: Props) -> Self {
        let position = if type_name == Self::TYPE_END {
            PackPosition::End
        } else {
            PackPosition::Start
        };
        Self {
            base: NodeBase::new(ctx, type_name, None, props),
            position,
            child: None,
            attached: false,
        }
    }

    fn pack_into(&self, pack: &dyn PackContainer, child: NativeHandle) -> Result<()> {
        match self.position {
            PackPosition::Start => pack.pack_start(child),
            PackPosition::End => pack.pack_end(child),
        }
    }
}

impl Node for PackSlotNode {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn attached_handle(&self) -> Option<NativeHandle> {
        self.child
    }

    fn on_child_appended(
        &mut self,
        child: &mut dyn Node,
        own_parent: Option<&dyn Node>,
    ) -> Result<bool> {
        let Some(handle) = child.attached_handle() else {
            return Ok(true);
        };
        self.child = Some(handle);
        if self.attached {
            if let Some(pack) = own_parent.and_then(Node::as_pack_container) {
                self.pack_into(pack, handle)?;
            }
        }
        Ok(true)
    }

    fn on_child_removed(
        &mut self,
        child: &mut dyn Node,
        own_parent: Option<&dyn Node>,
    ) -> Result<bool> {
        if child.attached_handle() == self.child {
            if let (Some(handle), true) = (self.child, self.attached) {
                if let Some(pack) = own_parent.and_then(Node::as_pack_container) {
                    pack.remove_from_pack(handle)?;
                }
            }
            self.child = None;
        }
        Ok(true)
    }

    fn attach_to_parent(&mut self, parent: &dyn Node) -> Result<()> {
        let Some(pack) = parent.as_pack_container() else {
            return Err(Error::unsupported_child(parent.type_name(), self.type_name()));
        };
        self.attached = true;
        if let Some(child) = self.child {
            self.pack_into(pack, child)?;
        }
        Ok(())
    }

    fn attach_to_parent_before(&mut self, parent: &dyn Node, _before: &dyn Node) -> Result<()> {
        // Pack groups have no order beyond start/end; an insert is an attach.
        self.attach_to_parent(parent)
    }

    fn detach_from_parent(&mut self, parent: &dyn Node) -> Result<()> {
        if let Some(pack) = parent.as_pack_container() {
            if let (Some(child), true) = (self.child, self.attached) {
                pack.remove_from_pack(child)?;
            }
        }
        self.attached = false;
        Ok(())
    }

    fn commit_update(&mut self, _old: &Props, _new: &Props, _ctx: &CommitContext<'_>) -> Result<()> {
        // The slot itself carries no native state.
        Ok(())
    }
}
