/// Session configuration.
///
/// Keep this structure stable and minimal; add knobs only when a concrete
/// platform or gameplay requirement exists.
#[derive(Debug, Clone)]
pub struct DeviceInit {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior). FIFO is broadly supported and paces the
    /// game loop to the display.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode
    /// is selected instead.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features. Favor an empty set for portability.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the surface (a hint).
    pub desired_maximum_frame_latency: u32,

    /// Fixed horizontal resolution of the logical offscreen target.
    ///
    /// The logical height is derived from the screen aspect ratio at
    /// session start, so gameplay coordinates are device-independent.
    pub logical_width: u32,

    /// Clear color for both the offscreen and the screen target.
    pub clear_color: wgpu::Color,
}

impl Default for DeviceInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
            logical_width: 600,
            clear_color: wgpu::Color::BLACK,
        }
    }
}
