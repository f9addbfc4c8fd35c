// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! PGRAPH: graphics engine front end
//!
//! PGRAPH receives resolved methods from the PFIFO puller (or direct CPU
//! writes into a class window), looks them up in the per-class dispatch
//! tables and runs the handler against the shared render state.
//!
//! ## Dispatch
//!
//! ```text
//! PulledMethod ─► channel check ─► resolve(class, method)
//!                                   ├─ generic  (SET_OBJECT, NOP, NOTIFY, SET_CONTEXT_DMA_NOTIFY)
//!                                   ├─ class    (state update, VRAM fill/blit, render op)
//!                                   ├─ software (INTR_1 SOFTWARE_METHOD, method trapped)
//!                                   └─ invalid class (INTR_1 INVALID_CLASS, method trapped)
//! ```
//!
//! A method that completes an operation also completes the notify request
//! pending on its object, if any.
//!
//! ## Interrupts
//!
//! | Register   | Bits                                                              |
//! |------------|-------------------------------------------------------------------|
//! | INTR_0     | 0 ERROR, 4 CONTEXT_SWITCH, 8 VBLANK, 12 RANGE, 16 METHOD_COUNT, 20 NOTIFY, 28 SOFTWARE_NOTIFY |
//! | INTR_1     | 0 SOFTWARE_METHOD, 4 INVALID_DATA, 8 INVALID_CLASS, 12 DOUBLE_NOTIFY, 16 CTXSW_NOTIFY |
//! | DMA_INTR_0 | 0 INSTANCE, 4 PRESENT, 8 PROTECTION, 12 LINEAR, 16 NOTIFY         |
//!
//! INTR_0 bit 0 is not stored: it reads as set whenever INTR_1 is non-zero.
//!
//! ## References
//!
//! - envytools: NV3 PGRAPH and object class documentation
//! - Rivatv / xf86-video-nv class method offsets

mod classes;
mod dispatch;
mod dma;
mod notifier;
mod primitives;
mod registers;
mod render;

pub use classes::ClassState;
pub use dispatch::{
    class, class_window, decode_class_window, is_valid_class, methods, resolve, ClassMethod,
    GenericMethod, MethodRange, Resolution, CLASS_WINDOW_BASE, CLASS_WINDOW_SIZE,
};
pub use notifier::{Notification, NotifyKind, PendingNotify};
pub use primitives::{rop3, Color10, ColorFormat, Point, Size};
pub use registers::{ClipRect, ContextUser, Pattern, PatternShape, PgraphStatus, Surface};
pub use render::{D3dVertex, RenderOp, MAX_RENDER_OPS};

use crate::core::memory::{merge_lanes, HostMemory, MmioDevice, Vram};
use crate::core::pfifo::PulledMethod;
use crate::core::ramin::{GraphicsObject, RamhtConfig, RaminContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PGRAPH_DEBUG_0: u32 = 0x400080;
pub const PGRAPH_DEBUG_1: u32 = 0x400084;
pub const PGRAPH_DEBUG_2: u32 = 0x400088;
pub const PGRAPH_DEBUG_3: u32 = 0x40008C;
pub const PGRAPH_INTR_0: u32 = 0x400100;
pub const PGRAPH_INTR_1: u32 = 0x400104;
pub const PGRAPH_INTR_EN_0: u32 = 0x400140;
pub const PGRAPH_INTR_EN_1: u32 = 0x400144;
pub const PGRAPH_CTX_SWITCH: u32 = 0x400180;
pub const PGRAPH_CTX_CONTROL: u32 = 0x400190;
pub const PGRAPH_CTX_USER: u32 = 0x400194;
pub const PGRAPH_CTX_CACHE_START: u32 = 0x4001A0;
pub const PGRAPH_CTX_CACHE_END: u32 = 0x4001BC;
pub const PGRAPH_UCLIP_XMIN: u32 = 0x40053C;
pub const PGRAPH_UCLIP_YMIN: u32 = 0x400540;
pub const PGRAPH_UCLIP_XMAX: u32 = 0x400544;
pub const PGRAPH_UCLIP_YMAX: u32 = 0x400548;
pub const PGRAPH_CLIP_MISC: u32 = 0x40054C;
pub const PGRAPH_OCLIP_XMIN: u32 = 0x400560;
pub const PGRAPH_OCLIP_YMIN: u32 = 0x400564;
pub const PGRAPH_OCLIP_XMAX: u32 = 0x400568;
pub const PGRAPH_OCLIP_YMAX: u32 = 0x40056C;
pub const PGRAPH_PATTERN_COLOR_0: u32 = 0x400600;
pub const PGRAPH_PATTERN_COLOR_1: u32 = 0x400604;
pub const PGRAPH_PATTERN_ALPHA_0: u32 = 0x400608;
pub const PGRAPH_PATTERN_ALPHA_1: u32 = 0x40060C;
pub const PGRAPH_PATTERN_BITMAP_0: u32 = 0x400610;
pub const PGRAPH_PATTERN_BITMAP_1: u32 = 0x400614;
pub const PGRAPH_PATTERN_SHAPE: u32 = 0x400618;
pub const PGRAPH_CHROMA: u32 = 0x40062C;
pub const PGRAPH_SURFACE_PITCH: u32 = 0x400630;
pub const PGRAPH_SURFACE_OFFSET: u32 = 0x400634;
pub const PGRAPH_BETA: u32 = 0x400640;
pub const PGRAPH_ROP: u32 = 0x400644;
pub const PGRAPH_PLANE_MASK: u32 = 0x400648;
pub const PGRAPH_NOTIFY: u32 = 0x400684;
pub const PGRAPH_FIFO_ACCESS: u32 = 0x4006A4;
pub const PGRAPH_STATUS: u32 = 0x4006B0;
pub const PGRAPH_TRAPPED_ADDR: u32 = 0x4006B4;
pub const PGRAPH_TRAPPED_DATA: u32 = 0x4006B8;
pub const PGRAPH_DMA: u32 = 0x401000;
pub const PGRAPH_DMA_INTR_0: u32 = 0x401100;
pub const PGRAPH_DMA_INTR_EN_0: u32 = 0x401140;

const INTR_EN_0_MASK: u32 = 0x1111_1111;
const INTR_EN_1_MASK: u32 = 0x0001_1111;
const DMA_INTR_EN_MASK: u32 = 0x0001_1111;
const CTX_SWITCH_MASK: u32 = 0x3FF3_F71F;

bitflags::bitflags! {
    /// `PGRAPH_INTR_0` bits
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PgraphIntr0: u32 {
        const ERROR = 1 << 0;
        const CONTEXT_SWITCH = 1 << 4;
        const VBLANK = 1 << 8;
        const RANGE = 1 << 12;
        const METHOD_COUNT = 1 << 16;
        const NOTIFY = 1 << 20;
        const SOFTWARE_NOTIFY = 1 << 28;
    }
}

bitflags::bitflags! {
    /// `PGRAPH_INTR_1` bits
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PgraphIntr1: u32 {
        const SOFTWARE_METHOD = 1 << 0;
        const INVALID_DATA = 1 << 4;
        const INVALID_CLASS = 1 << 8;
        const DOUBLE_NOTIFY = 1 << 12;
        const CTXSW_NOTIFY = 1 << 16;
    }
}

bitflags::bitflags! {
    /// `PGRAPH_DMA_INTR_0` bits
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PgraphDmaIntr: u32 {
        const INSTANCE = 1 << 0;
        const PRESENT = 1 << 4;
        const PROTECTION = 1 << 8;
        const LINEAR = 1 << 12;
        const NOTIFY = 1 << 16;
    }
}

/// Memory and services a method handler may touch
pub struct GraphicsBus<'a> {
    pub vram: &'a mut Vram,
    /// PCI/AGP system memory behind DMA objects
    pub host: &'a mut dyn HostMemory,
    /// Used to resolve `SET_CONTEXT_DMA_NOTIFY` names
    pub ramht: RamhtConfig,
    /// PTIMER nanoseconds, stamped into notification records
    pub time: u64,
    /// Framebuffer depth from PFB
    pub bytes_per_pixel: u32,
}

/// The object a method is running against
#[derive(Debug, Clone, Copy)]
pub(crate) struct BoundObject {
    pub class: u8,
    pub channel: u8,
    pub subchannel: u8,
    /// Byte offset of the instance in RAMIN
    pub instance_address: u32,
    pub object: GraphicsObject,
}

impl BoundObject {
    /// Instance in 16-byte units, the key for pending notifies
    pub fn instance(&self) -> u16 {
        (self.instance_address >> 4) as u16
    }

    pub fn color_format(&self) -> ColorFormat {
        ColorFormat::from_bits(self.object.color_format()).unwrap_or(ColorFormat::A8R8G8B8)
    }

    pub fn expand(&self, value: u32) -> Color10 {
        Color10::expand(self.color_format(), value, self.object.alpha_enabled())
    }
}

/// Graphics engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pgraph {
    debug: [u32; 4],
    intr_0: PgraphIntr0,
    intr_1: PgraphIntr1,
    intr_en_0: u32,
    intr_en_1: u32,
    dma_intr: PgraphDmaIntr,
    dma_intr_en: u32,

    ctx_switch: u32,
    ctx_control: u32,
    ctx_user: ContextUser,
    /// Context bound to each subchannel by SET_OBJECT
    ctx_cache: [u32; 8],

    user_clip: ClipRect,
    object_clip: ClipRect,
    /// Opaque: layout not documented
    clip_misc: u32,
    surface: Surface,
    pattern: Pattern,

    /// Chroma key, A1R10G10B10; the alpha bit enables it
    chroma: u32,
    chroma_raw: u32,
    beta: u32,
    rop: u8,
    /// A1R10G10B10
    plane_mask: u32,
    plane_mask_raw: u32,

    notify: u32,
    fifo_access: bool,
    reset_fifo_access: bool,
    status: PgraphStatus,
    trapped_addr: u32,
    trapped_data: u32,
    /// Opaque: layout not documented
    dma: u32,

    /// Notify requests waiting for their operation, keyed by instance
    pending_notifies: BTreeMap<u16, PendingNotify>,
    current_instance: u16,

    classes: ClassState,
    render_ops: Vec<RenderOp>,
}

impl Pgraph {
    /// ROP at reset: SRCCOPY
    pub const DEFAULT_ROP: u8 = 0xCC;

    pub fn new(fifo_access: bool) -> Self {
        Self {
            debug: [0; 4],
            intr_0: PgraphIntr0::empty(),
            intr_1: PgraphIntr1::empty(),
            intr_en_0: 0,
            intr_en_1: 0,
            dma_intr: PgraphDmaIntr::empty(),
            dma_intr_en: 0,
            ctx_switch: 0,
            ctx_control: 0,
            ctx_user: ContextUser::default(),
            ctx_cache: [0; 8],
            user_clip: ClipRect::default(),
            object_clip: ClipRect::default(),
            clip_misc: 0,
            surface: Surface::default(),
            pattern: Pattern::default(),
            chroma: 0,
            chroma_raw: 0,
            beta: 0,
            rop: Self::DEFAULT_ROP,
            plane_mask: Color10 {
                alpha: true,
                r: 0x3FF,
                g: 0x3FF,
                b: 0x3FF,
            }
            .to_a1r10g10b10(),
            plane_mask_raw: 0xFFFF_FFFF,
            notify: 0,
            fifo_access,
            reset_fifo_access: fifo_access,
            status: PgraphStatus::default(),
            trapped_addr: 0,
            trapped_data: 0,
            dma: 0,
            pending_notifies: BTreeMap::new(),
            current_instance: 0,
            classes: ClassState::default(),
            render_ops: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.reset_fifo_access);
        log::info!("PGRAPH reset (FIFO access {})", self.fifo_access);
    }

    // ------------------------------------------------------------------------
    // State queries
    // ------------------------------------------------------------------------

    /// Whether the puller may hand methods to PGRAPH
    pub fn fifo_access(&self) -> bool {
        self.fifo_access
    }

    pub fn context_user(&self) -> ContextUser {
        self.ctx_user
    }

    pub fn status(&self) -> PgraphStatus {
        self.status
    }

    pub fn user_clip(&self) -> ClipRect {
        self.user_clip
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn rop(&self) -> u8 {
        self.rop
    }

    pub fn beta(&self) -> u32 {
        self.beta
    }

    pub fn subchannel_context(&self, subchannel: u8) -> RaminContext {
        RaminContext(self.ctx_cache[(subchannel & 7) as usize])
    }

    pub fn pending_notify(&self, instance: u16) -> Option<&PendingNotify> {
        self.pending_notifies.get(&instance)
    }

    /// INTR_0 as read by the CPU (ERROR folded in from INTR_1)
    pub fn intr_0(&self) -> PgraphIntr0 {
        if self.intr_1.is_empty() {
            self.intr_0
        } else {
            self.intr_0 | PgraphIntr0::ERROR
        }
    }

    pub fn intr_1(&self) -> PgraphIntr1 {
        self.intr_1
    }

    pub fn dma_intr(&self) -> PgraphDmaIntr {
        self.dma_intr
    }

    /// PMC PGRAPH0: INTR_0 and DMA_INTR_0
    pub fn interrupt_pending_0(&self) -> bool {
        self.intr_0().bits() & self.intr_en_0 != 0 || self.dma_intr.bits() & self.dma_intr_en != 0
    }

    /// PMC PGRAPH1: INTR_1
    pub fn interrupt_pending_1(&self) -> bool {
        self.intr_1.bits() & self.intr_en_1 != 0
    }

    /// Clear the enabled INTR_0 and DMA_INTR_0 bits after a `PMC_INTR` read
    pub fn acknowledge_pending_0(&mut self) {
        self.intr_0 &= !PgraphIntr0::from_bits_truncate(self.intr_en_0);
        self.dma_intr &= !PgraphDmaIntr::from_bits_truncate(self.dma_intr_en);
    }

    /// Clear the enabled INTR_1 bits after a `PMC_INTR` read
    pub fn acknowledge_pending_1(&mut self) {
        self.intr_1 &= !PgraphIntr1::from_bits_truncate(self.intr_en_1);
    }

    /// Take the render operations recorded since the last call
    pub fn drain_render_ops(&mut self) -> Vec<RenderOp> {
        std::mem::take(&mut self.render_ops)
    }

    pub fn render_ops(&self) -> &[RenderOp] {
        &self.render_ops
    }

    // ------------------------------------------------------------------------
    // Interrupt helpers
    // ------------------------------------------------------------------------

    fn raise_0(&mut self, bits: PgraphIntr0) {
        self.intr_0 |= bits;
        log::trace!("PGRAPH intr_0 0x{:08X}", self.intr_0.bits());
    }

    fn raise_1(&mut self, bits: PgraphIntr1) {
        self.intr_1 |= bits;
        log::trace!("PGRAPH intr_1 0x{:08X}", self.intr_1.bits());
    }

    fn raise_dma(&mut self, bits: PgraphDmaIntr) {
        self.dma_intr |= bits;
        log::trace!("PGRAPH dma_intr 0x{:08X}", self.dma_intr.bits());
    }

    /// Start of a display frame
    pub fn vblank(&mut self) {
        if self.intr_en_0 & PgraphIntr0::VBLANK.bits() != 0 {
            self.raise_0(PgraphIntr0::VBLANK);
        }
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Execute a method handed over by the PFIFO puller
    pub fn execute(&mut self, bus: &mut GraphicsBus, pulled: &PulledMethod) {
        let context = pulled.context;
        let class_id = context.pgraph_class();

        if pulled.channel != self.ctx_user.channel() {
            log::debug!(
                "PGRAPH: context switch ch {} -> {}",
                self.ctx_user.channel(),
                pulled.channel
            );
            self.raise_0(PgraphIntr0::CONTEXT_SWITCH);
        }
        self.ctx_user = ContextUser::new(pulled.channel, class_id, pulled.subchannel);

        let instance_address = context.instance_address();
        let object = GraphicsObject::read(bus.vram, instance_address);
        self.ctx_switch = object.words[0] & CTX_SWITCH_MASK;
        self.current_instance = context.ramin_offset();

        let bound = BoundObject {
            class: class_id,
            channel: pulled.channel,
            subchannel: pulled.subchannel,
            instance_address,
            object,
        };

        log::trace!(
            "PGRAPH: ch={} subch={} class=0x{:02X} method=0x{:04X} data=0x{:08X}",
            pulled.channel,
            pulled.subchannel,
            class_id,
            pulled.method,
            pulled.data
        );

        let completed = match resolve(class_id, pulled.method) {
            Resolution::Generic(generic) => {
                self.execute_generic(bus, &bound, generic, context, pulled.data)
            }
            Resolution::Class(method, index) => {
                self.status.set(PgraphStatus::PORT_REGISTER, true);
                let completed = self.execute_class_method(bus, &bound, method, index, pulled.data);
                self.status.set(PgraphStatus::PORT_REGISTER, false);
                completed
            }
            Resolution::Software => {
                self.trap(&bound, pulled.method, pulled.data);
                false
            }
            Resolution::InvalidClass => {
                log::warn!(
                    "PGRAPH: invalid class 0x{:02X} (ctx 0x{:08X})",
                    class_id,
                    context.raw()
                );
                self.raise_1(PgraphIntr1::INVALID_CLASS);
                self.trap(&bound, pulled.method, pulled.data);
                false
            }
        };

        if completed {
            self.complete_notify(bus, &bound, pulled.method);
        }
    }

    /// Execute a CPU write into a class window
    ///
    /// The method runs against the object of that class bound to the lowest
    /// subchannel in the current channel. Without such an object the write is
    /// trapped as a software method.
    pub fn execute_window_write(&mut self, bus: &mut GraphicsBus, addr: u32, value: u32) {
        let Some((class_id, method)) = decode_class_window(addr) else {
            log::warn!("PGRAPH: write outside class windows 0x{:06X}", addr);
            return;
        };

        let channel = self.ctx_user.channel();
        let bound = self
            .ctx_cache
            .iter()
            .enumerate()
            .map(|(subch, &ctx)| (subch as u8, RaminContext(ctx)))
            .find(|(_, ctx)| !ctx.is_empty() && ctx.pgraph_class() == class_id);

        match bound {
            Some((subchannel, ctx)) => {
                let pulled = PulledMethod {
                    cache: crate::core::pfifo::CacheId::Cache1,
                    channel,
                    subchannel,
                    method,
                    data: value,
                    context: RaminContext(ctx.cached() | ((channel as u32) << 24)),
                };
                self.execute(bus, &pulled);
            }
            None => {
                log::debug!(
                    "PGRAPH: no class 0x{:02X} object bound for window write 0x{:06X}",
                    class_id,
                    addr
                );
                self.trapped_addr = ((channel as u32) << 16) | method;
                self.trapped_data = value;
                self.raise_1(PgraphIntr1::SOFTWARE_METHOD);
            }
        }
    }

    fn execute_generic(
        &mut self,
        bus: &mut GraphicsBus,
        bound: &BoundObject,
        generic: GenericMethod,
        context: RaminContext,
        data: u32,
    ) -> bool {
        match generic {
            GenericMethod::SetObject => {
                self.ctx_cache[bound.subchannel as usize] = context.raw();
                log::debug!(
                    "PGRAPH: subch {} bound to class 0x{:02X} instance 0x{:04X}",
                    bound.subchannel,
                    bound.class,
                    bound.instance()
                );
                false
            }
            GenericMethod::NoOperation => true,
            GenericMethod::Notify => {
                self.request_notify(bus, bound, data);
                false
            }
            GenericMethod::SetContextDmaNotify => {
                self.set_context_dma_notify(bus, bound, data);
                false
            }
        }
    }

    /// Record a method PGRAPH cannot execute for the driver's handler
    fn trap(&mut self, bound: &BoundObject, method: u32, data: u32) {
        self.trapped_addr =
            ((bound.channel as u32) << 16) | ((bound.subchannel as u32) << 13) | (method & 0x1FFC);
        self.trapped_data = data;
        self.raise_1(PgraphIntr1::SOFTWARE_METHOD);
        log::debug!(
            "PGRAPH: software method class=0x{:02X} method=0x{:04X} data=0x{:08X}",
            bound.class,
            method,
            data
        );
    }

    fn invalid_data(&mut self, bound: &BoundObject, method: &str, data: u32) {
        log::warn!(
            "PGRAPH: invalid data for {} on class 0x{:02X}: 0x{:08X}",
            method,
            bound.class,
            data
        );
        self.raise_1(PgraphIntr1::INVALID_DATA);
    }
}

impl MmioDevice for Pgraph {
    fn address_range(&self) -> (u32, u32) {
        (0x400000, 0x401FFF)
    }

    fn peek32(&self, addr: u32) -> u32 {
        match addr {
            PGRAPH_DEBUG_0..=PGRAPH_DEBUG_3 if addr & 3 == 0 => {
                self.debug[((addr - PGRAPH_DEBUG_0) >> 2) as usize]
            }
            PGRAPH_INTR_0 => self.intr_0().bits(),
            PGRAPH_INTR_1 => self.intr_1.bits(),
            PGRAPH_INTR_EN_0 => self.intr_en_0,
            PGRAPH_INTR_EN_1 => self.intr_en_1,
            PGRAPH_CTX_SWITCH => self.ctx_switch,
            PGRAPH_CTX_CONTROL => self.ctx_control,
            PGRAPH_CTX_USER => self.ctx_user.raw(),
            PGRAPH_CTX_CACHE_START..=PGRAPH_CTX_CACHE_END if addr & 3 == 0 => {
                self.ctx_cache[((addr - PGRAPH_CTX_CACHE_START) >> 2) as usize]
            }
            PGRAPH_UCLIP_XMIN => ClipRect::encode(self.user_clip.x_min),
            PGRAPH_UCLIP_YMIN => ClipRect::encode(self.user_clip.y_min),
            PGRAPH_UCLIP_XMAX => ClipRect::encode(self.user_clip.x_max),
            PGRAPH_UCLIP_YMAX => ClipRect::encode(self.user_clip.y_max),
            PGRAPH_CLIP_MISC => self.clip_misc,
            PGRAPH_OCLIP_XMIN => ClipRect::encode(self.object_clip.x_min),
            PGRAPH_OCLIP_YMIN => ClipRect::encode(self.object_clip.y_min),
            PGRAPH_OCLIP_XMAX => ClipRect::encode(self.object_clip.x_max),
            PGRAPH_OCLIP_YMAX => ClipRect::encode(self.object_clip.y_max),
            PGRAPH_PATTERN_COLOR_0 => self.pattern.color[0],
            PGRAPH_PATTERN_COLOR_1 => self.pattern.color[1],
            PGRAPH_PATTERN_ALPHA_0 => self.pattern.alpha[0],
            PGRAPH_PATTERN_ALPHA_1 => self.pattern.alpha[1],
            PGRAPH_PATTERN_BITMAP_0 => self.pattern.bitmap[0],
            PGRAPH_PATTERN_BITMAP_1 => self.pattern.bitmap[1],
            PGRAPH_PATTERN_SHAPE => self.pattern.shape_register(),
            PGRAPH_CHROMA => self.chroma,
            PGRAPH_SURFACE_PITCH => self.surface.pitch,
            PGRAPH_SURFACE_OFFSET => self.surface.offset,
            PGRAPH_BETA => self.beta,
            PGRAPH_ROP => self.rop as u32,
            PGRAPH_PLANE_MASK => self.plane_mask,
            PGRAPH_NOTIFY => self.notify,
            PGRAPH_FIFO_ACCESS => self.fifo_access as u32,
            PGRAPH_STATUS => self.status.raw(),
            PGRAPH_TRAPPED_ADDR => self.trapped_addr,
            PGRAPH_TRAPPED_DATA => self.trapped_data,
            PGRAPH_DMA => self.dma,
            PGRAPH_DMA_INTR_0 => self.dma_intr.bits(),
            PGRAPH_DMA_INTR_EN_0 => self.dma_intr_en,
            _ => {
                log::warn!("PGRAPH: read from unknown register 0x{:06X}", addr);
                0
            }
        }
    }

    fn write32(&mut self, addr: u32, value: u32) {
        log::trace!("PGRAPH: write 0x{:06X} = 0x{:08X}", addr, value);
        match addr {
            PGRAPH_DEBUG_0..=PGRAPH_DEBUG_3 if addr & 3 == 0 => {
                self.debug[((addr - PGRAPH_DEBUG_0) >> 2) as usize] = value;
            }
            PGRAPH_INTR_0 => self.intr_0 &= !PgraphIntr0::from_bits_truncate(value),
            PGRAPH_INTR_1 => self.intr_1 &= !PgraphIntr1::from_bits_truncate(value),
            PGRAPH_INTR_EN_0 => self.intr_en_0 = value & INTR_EN_0_MASK,
            PGRAPH_INTR_EN_1 => self.intr_en_1 = value & INTR_EN_1_MASK,
            PGRAPH_CTX_SWITCH => self.ctx_switch = value & CTX_SWITCH_MASK,
            PGRAPH_CTX_CONTROL => self.ctx_control = value,
            PGRAPH_CTX_USER => {
                self.ctx_user = ContextUser(value & ContextUser::MASK);
                log::debug!("PGRAPH: CTX_USER = 0x{:08X}", self.ctx_user.raw());
            }
            PGRAPH_CTX_CACHE_START..=PGRAPH_CTX_CACHE_END if addr & 3 == 0 => {
                self.ctx_cache[((addr - PGRAPH_CTX_CACHE_START) >> 2) as usize] = value;
            }
            PGRAPH_UCLIP_XMIN => self.user_clip.x_min = ClipRect::decode(value),
            PGRAPH_UCLIP_YMIN => self.user_clip.y_min = ClipRect::decode(value),
            PGRAPH_UCLIP_XMAX => self.user_clip.x_max = ClipRect::decode(value),
            PGRAPH_UCLIP_YMAX => self.user_clip.y_max = ClipRect::decode(value),
            PGRAPH_CLIP_MISC => self.clip_misc = value,
            PGRAPH_OCLIP_XMIN => self.object_clip.x_min = ClipRect::decode(value),
            PGRAPH_OCLIP_YMIN => self.object_clip.y_min = ClipRect::decode(value),
            PGRAPH_OCLIP_XMAX => self.object_clip.x_max = ClipRect::decode(value),
            PGRAPH_OCLIP_YMAX => self.object_clip.y_max = ClipRect::decode(value),
            PGRAPH_PATTERN_COLOR_0 => self.pattern.color[0] = value & 0x7FFF_FFFF,
            PGRAPH_PATTERN_COLOR_1 => self.pattern.color[1] = value & 0x7FFF_FFFF,
            PGRAPH_PATTERN_ALPHA_0 => self.pattern.alpha[0] = value & 0xFF,
            PGRAPH_PATTERN_ALPHA_1 => self.pattern.alpha[1] = value & 0xFF,
            PGRAPH_PATTERN_BITMAP_0 => self.pattern.bitmap[0] = value,
            PGRAPH_PATTERN_BITMAP_1 => self.pattern.bitmap[1] = value,
            PGRAPH_PATTERN_SHAPE => {
                self.pattern.shape = match value & 3 {
                    1 => PatternShape::Horizontal64x1,
                    2 => PatternShape::Vertical1x64,
                    _ => PatternShape::Square8x8,
                }
            }
            PGRAPH_CHROMA => self.chroma = value & 0x7FFF_FFFF,
            PGRAPH_SURFACE_PITCH => self.surface.pitch = value & Surface::PITCH_MASK,
            PGRAPH_SURFACE_OFFSET => self.surface.offset = value & Surface::OFFSET_MASK,
            PGRAPH_BETA => self.beta = value & 0x7F80_0000,
            PGRAPH_ROP => self.rop = (value & 0xFF) as u8,
            PGRAPH_PLANE_MASK => self.plane_mask = value & 0x7FFF_FFFF,
            PGRAPH_NOTIFY => {
                self.notify = value & 0x0011_00FF;
                if self.notify & notifier::NOTIFY_PENDING == 0 {
                    self.cancel_notify(self.current_instance);
                }
            }
            PGRAPH_FIFO_ACCESS => {
                self.fifo_access = value & 1 != 0;
                log::debug!("PGRAPH: FIFO access {}", self.fifo_access);
            }
            PGRAPH_STATUS => log::debug!("PGRAPH: STATUS is read-only"),
            PGRAPH_TRAPPED_ADDR | PGRAPH_TRAPPED_DATA => {
                log::debug!("PGRAPH: trap registers are read-only")
            }
            PGRAPH_DMA => self.dma = value,
            PGRAPH_DMA_INTR_0 => self.dma_intr &= !PgraphDmaIntr::from_bits_truncate(value),
            PGRAPH_DMA_INTR_EN_0 => self.dma_intr_en = value & DMA_INTR_EN_MASK,
            _ => log::warn!(
                "PGRAPH: write to unknown register 0x{:06X} = 0x{:08X}",
                addr,
                value
            ),
        }
    }

    fn write_masked(&mut self, addr: u32, value: u32, mask: u32) {
        match addr {
            PGRAPH_INTR_0 | PGRAPH_INTR_1 | PGRAPH_DMA_INTR_0 => self.write32(addr, value & mask),
            _ => {
                let current = self.peek32(addr);
                self.write32(addr, merge_lanes(current, value, mask));
            }
        }
    }

    fn name(&self) -> &str {
        "PGRAPH"
    }
}

impl Default for Pgraph {
    fn default() -> Self {
        Self::new(true)
    }
}
