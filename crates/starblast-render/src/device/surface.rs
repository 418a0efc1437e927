use winit::dpi::PhysicalSize;

/// Minimum color depth the game accepts, matching the original hardware
/// requirement of a 16-bit framebuffer.
const MIN_COLOR_BITS: u32 = 16;

fn color_bits(format: wgpu::TextureFormat) -> u32 {
    match format {
        wgpu::TextureFormat::Bgra8Unorm
        | wgpu::TextureFormat::Bgra8UnormSrgb
        | wgpu::TextureFormat::Rgba8Unorm
        | wgpu::TextureFormat::Rgba8UnormSrgb => 24,
        wgpu::TextureFormat::Rgb10a2Unorm => 30,
        wgpu::TextureFormat::Rgba16Float => 48,
        // Anything else a surface offers meets the floor in practice.
        _ => MIN_COLOR_BITS,
    }
}

/// Picks a surface format with at least [`MIN_COLOR_BITS`] of color,
/// preferring sRGB when requested. `None` means no compatible format exists.
pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let eligible: Vec<wgpu::TextureFormat> = caps
        .formats
        .iter()
        .copied()
        .filter(|f| color_bits(*f) >= MIN_COLOR_BITS)
        .collect();

    if eligible.is_empty() {
        return None;
    }

    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        for f in preferred {
            if eligible.contains(&f) {
                return Some(f);
            }
        }
    }

    Some(eligible[0])
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

pub(crate) fn apply_resize(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &mut wgpu::SurfaceConfiguration,
    size: &mut PhysicalSize<u32>,
    new_size: PhysicalSize<u32>,
) {
    if new_size.width == 0 || new_size.height == 0 {
        // wgpu cannot configure a 0x0 surface; remember the size and defer.
        *size = new_size;
        return;
    }

    *size = new_size;
    config.width = new_size.width;
    config.height = new_size.height;

    surface.configure(device, config);
}
