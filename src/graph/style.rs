use eframe::egui::Color32;

use super::{EdgeKind, EdgeStyle, NodeKind, NodeStyle};

pub const OCCUPATION_COLOR: Color32 = Color32::from_rgb(0x3b, 0x82, 0xf6);
pub const SKILL_COLOR: Color32 = Color32::from_rgb(0x10, 0xb9, 0x81);
pub const GROUP_COLOR: Color32 = Color32::from_rgb(0xf5, 0x9e, 0x0b);

pub const HIERARCHY_EDGE_COLOR: Color32 = Color32::from_rgb(0x94, 0xa3, 0xb8);
pub const ESSENTIAL_EDGE_COLOR: Color32 = Color32::from_rgb(0xef, 0x44, 0x44);
pub const OPTIONAL_EDGE_COLOR: Color32 = Color32::from_rgb(0x64, 0x74, 0x8b);

pub const BASE_Z: i32 = 1;
pub const BACKGROUND_Z: i32 = 0;

/// `clamp(count / divisor, min, max)`, monotonic in `count`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SizeCurve {
    pub divisor: f32,
    pub min: f32,
    pub max: f32,
}

impl SizeCurve {
    pub fn size(self, count: usize) -> f32 {
        (count as f32 / self.divisor).clamp(self.min, self.max)
    }
}

pub const GROUP_SIZE: SizeCurve = SizeCurve {
    divisor: 15.0,
    min: 8.0,
    max: 20.0,
};
pub const OCCUPATION_SIZE: SizeCurve = SizeCurve {
    divisor: 2.0,
    min: 8.0,
    max: 25.0,
};
pub const SKILL_SIZE: SizeCurve = SizeCurve {
    divisor: 5.0,
    min: 3.0,
    max: 8.0,
};
/// Skills pulled in by a cluster expansion share one fixed size.
pub const EXPANDED_SKILL_SIZE: SizeCurve = SizeCurve {
    divisor: 1.0,
    min: 6.0,
    max: 6.0,
};
pub const PROGRESSIVE_SKILL_SIZE: SizeCurve = SizeCurve {
    divisor: 5.0,
    min: 2.0,
    max: 6.0,
};

pub fn kind_color(kind: NodeKind) -> Color32 {
    match kind {
        NodeKind::Occupation => OCCUPATION_COLOR,
        NodeKind::Skill => SKILL_COLOR,
        NodeKind::Group => GROUP_COLOR,
    }
}

pub fn node_base_style(kind: NodeKind, size: f32) -> NodeStyle {
    NodeStyle {
        color: kind_color(kind),
        size,
        z_index: BASE_Z,
        label_visible: true,
    }
}

pub fn edge_base_style(kind: EdgeKind) -> EdgeStyle {
    let (color, size) = match kind {
        EdgeKind::Hierarchy => (HIERARCHY_EDGE_COLOR, 2.0),
        EdgeKind::Essential => (ESSENTIAL_EDGE_COLOR, 1.0),
        EdgeKind::Optional => (OPTIONAL_EDGE_COLOR, 1.0),
    };
    EdgeStyle {
        color,
        size,
        z_index: BASE_Z,
    }
}

/// Three-tier emphasis applied over the whole graph when a node is focused.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HighlightScheme {
    pub focus_color: Color32,
    pub focus_scale: f32,
    pub focus_z: i32,
    pub neighbor_scale: f32,
    pub neighbor_z: i32,
    pub background_color: Color32,
    pub background_scale: f32,
    pub edge_color: Color32,
    pub edge_scale: f32,
    pub edge_min_size: f32,
    pub edge_z: i32,
    pub background_edge_color: Color32,
    pub background_edge_scale: f32,
    pub background_edge_min_size: f32,
}

impl HighlightScheme {
    pub fn click() -> Self {
        Self {
            focus_color: Color32::from_rgb(0xff, 0x6b, 0x35),
            focus_scale: 1.5,
            focus_z: 100,
            neighbor_scale: 1.2,
            neighbor_z: 50,
            background_color: Color32::from_rgb(0xe5, 0xe7, 0xeb),
            background_scale: 0.6,
            edge_color: Color32::from_rgb(0xff, 0x6b, 0x35),
            edge_scale: 2.0,
            edge_min_size: 2.0,
            edge_z: 75,
            background_edge_color: Color32::from_rgb(0xe5, 0xe7, 0xeb),
            background_edge_scale: 0.3,
            background_edge_min_size: 0.5,
        }
    }

    pub fn search() -> Self {
        Self {
            focus_color: Color32::from_rgb(0xeb, 0x5d, 0x42),
            focus_scale: 2.0,
            neighbor_scale: 1.3,
            background_color: Color32::from_rgb(0xd1, 0xd5, 0xdb),
            background_scale: 0.5,
            edge_color: Color32::from_rgb(0xeb, 0x5d, 0x42),
            edge_scale: 2.5,
            edge_min_size: 3.0,
            background_edge_scale: 0.2,
            background_edge_min_size: 0.3,
            ..Self::click()
        }
    }

    pub fn focus_style(&self, base: &NodeStyle) -> NodeStyle {
        NodeStyle {
            color: self.focus_color,
            size: base.size * self.focus_scale,
            z_index: self.focus_z,
            label_visible: true,
        }
    }

    pub fn neighbor_style(&self, base: &NodeStyle) -> NodeStyle {
        NodeStyle {
            color: base.color,
            size: base.size * self.neighbor_scale,
            z_index: self.neighbor_z,
            label_visible: true,
        }
    }

    pub fn background_style(&self, base: &NodeStyle) -> NodeStyle {
        NodeStyle {
            color: self.background_color,
            size: base.size * self.background_scale,
            z_index: BACKGROUND_Z,
            label_visible: false,
        }
    }

    pub fn connected_edge_style(&self, base: &EdgeStyle) -> EdgeStyle {
        EdgeStyle {
            color: self.edge_color,
            size: (base.size * self.edge_scale).max(self.edge_min_size),
            z_index: self.edge_z,
        }
    }

    pub fn background_edge_style(&self, base: &EdgeStyle) -> EdgeStyle {
        EdgeStyle {
            color: self.background_edge_color,
            size: (base.size * self.background_edge_scale).max(self.background_edge_min_size),
            z_index: BACKGROUND_Z,
        }
    }
}
