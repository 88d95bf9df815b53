use crate::ren::error::{RenError, Result};

use ash::{util, vk, Device as DeviceHandle};
use std::io::Cursor;
use std::path::Path;

/// Reads a pre-compiled SPIR-V blob from disk and wraps it in a shader
/// module. Shader binaries are opaque to this crate; a missing or unreadable
/// file is fatal at startup.
pub fn load_shader_module(device_handle: &DeviceHandle, path: &Path) -> Result<vk::ShaderModule> {
    let bytes = std::fs::read(path).map_err(|source| RenError::ShaderRead {
        path: path.to_path_buf(),
        source,
    })?;
    let code = util::read_spv(&mut Cursor::new(bytes)).map_err(|source| RenError::ShaderRead {
        path: path.to_path_buf(),
        source,
    })?;

    let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
    let module = unsafe { device_handle.create_shader_module(&create_info, None)? };
    Ok(module)
}

pub fn create_pipeline_layout(
    device_handle: &DeviceHandle,
    set_layouts: &[vk::DescriptorSetLayout],
    push_constant_ranges: &[vk::PushConstantRange],
) -> Result<vk::PipelineLayout> {
    let create_info = vk::PipelineLayoutCreateInfo::default()
        .set_layouts(set_layouts)
        .push_constant_ranges(push_constant_ranges);

    let layout = unsafe { device_handle.create_pipeline_layout(&create_info, None)? };
    Ok(layout)
}

pub const SHADER_ENTRY_POINT: &std::ffi::CStr = c"main";

/// Fixed-state configuration for one graphics pipeline. Vertex data is pulled
/// through buffer device addresses, so there is no vertex-input state; the
/// deferred attachments never blend; viewport/scissor are dynamic.
pub struct GraphicsPipelineConfig {
    pub vertex_shader: vk::ShaderModule,
    pub fragment_shader: Option<vk::ShaderModule>,
    pub color_attachment_count: u32,
    pub depth: Option<vk::CompareOp>,
    pub cull_mode: vk::CullModeFlags,
}

impl GraphicsPipelineConfig {
    pub fn new(vertex_shader: vk::ShaderModule) -> Self {
        Self {
            vertex_shader,
            fragment_shader: None,
            color_attachment_count: 1,
            depth: None,
            cull_mode: vk::CullModeFlags::BACK,
        }
    }

    pub fn fragment_shader(mut self, module: vk::ShaderModule) -> Self {
        self.fragment_shader = Some(module);
        self
    }

    pub fn color_attachment_count(mut self, count: u32) -> Self {
        self.color_attachment_count = count;
        self
    }

    pub fn depth_test(mut self, compare_op: vk::CompareOp) -> Self {
        self.depth = Some(compare_op);
        self
    }

    pub fn cull_mode(mut self, cull_mode: vk::CullModeFlags) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    pub fn build(
        self,
        device_handle: &DeviceHandle,
        layout: vk::PipelineLayout,
        render_pass: vk::RenderPass,
    ) -> Result<vk::Pipeline> {
        let mut stages = vec![vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(self.vertex_shader)
            .name(SHADER_ENTRY_POINT)];
        if let Some(fragment_shader) = self.fragment_shader {
            stages.push(
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(vk::ShaderStageFlags::FRAGMENT)
                    .module(fragment_shader)
                    .name(SHADER_ENTRY_POINT),
            );
        }

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default();
        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST);
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);
        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(self.cull_mode)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .line_width(1.0);
        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let depth_stencil_state = match self.depth {
            Some(compare_op) => vk::PipelineDepthStencilStateCreateInfo::default()
                .depth_test_enable(true)
                .depth_write_enable(true)
                .depth_compare_op(compare_op)
                .max_depth_bounds(1.0),
            None => vk::PipelineDepthStencilStateCreateInfo::default(),
        };

        let blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = (0..self
            .color_attachment_count)
            .map(|_| {
                vk::PipelineColorBlendAttachmentState::default()
                    .blend_enable(false)
                    .color_write_mask(vk::ColorComponentFlags::RGBA)
            })
            .collect();
        let color_blend_state =
            vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let create_infos = [vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .depth_stencil_state(&depth_stencil_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0)];

        let pipelines = unsafe {
            device_handle
                .create_graphics_pipelines(vk::PipelineCache::null(), &create_infos, None)
                .map_err(|(_, result)| RenError::PipelineCompile(result))?
        };

        Ok(pipelines[0])
    }
}

pub fn create_compute_pipeline(
    device_handle: &DeviceHandle,
    shader_module: vk::ShaderModule,
    layout: vk::PipelineLayout,
) -> Result<vk::Pipeline> {
    let stage = vk::PipelineShaderStageCreateInfo::default()
        .stage(vk::ShaderStageFlags::COMPUTE)
        .module(shader_module)
        .name(SHADER_ENTRY_POINT);

    let create_infos = [vk::ComputePipelineCreateInfo::default().layout(layout).stage(stage)];

    let pipelines = unsafe {
        device_handle
            .create_compute_pipelines(vk::PipelineCache::null(), &create_infos, None)
            .map_err(|(_, result)| RenError::PipelineCompile(result))?
    };

    Ok(pipelines[0])
}

/// Shared linear clamp-to-edge sampler used for every cross-stage image read.
pub fn create_sampler(device_handle: &DeviceHandle) -> Result<vk::Sampler> {
    let create_info = vk::SamplerCreateInfo::default()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
        .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .max_lod(vk::LOD_CLAMP_NONE);

    let sampler = unsafe { device_handle.create_sampler(&create_info, None)? };
    Ok(sampler)
}
