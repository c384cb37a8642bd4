use rgb::RGBA8;

/// 完全透明，画布的初始状态以及 restore-to-background 清除后的颜色
pub const BACKGROUND: RGBA8 = RGBA8 {
    r: 0,
    g: 0,
    b: 0,
    a: 0,
};

/// 延时为 0 的帧在多数播放器里会被拉长到默认值，统一改为 10（百分之一秒）
pub const MIN_DELAY: u16 = 10;

/// 帧显示之后、下一帧绘制之前对画布的处理方式
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Disposal {
    /// 未指定，按 `Keep` 处理
    Unspecified,
    Keep,
    /// 把本帧补丁所在矩形清为背景
    Background,
    /// 恢复到绘制本帧之前的画布
    Previous,
}

impl From<gif::DisposalMethod> for Disposal {
    fn from(method: gif::DisposalMethod) -> Self {
        match method {
            gif::DisposalMethod::Any => Disposal::Unspecified,
            gif::DisposalMethod::Keep => Disposal::Keep,
            gif::DisposalMethod::Background => Disposal::Background,
            gif::DisposalMethod::Previous => Disposal::Previous,
        }
    }
}

/// 解码后的原始帧：只包含本帧更新的矩形补丁
#[derive(Clone, Debug)]
pub struct RawFrame {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    /// 调色板索引，`width * height` 个，已经解压并去隔行
    pub indices: Vec<u8>,
    /// 本帧生效的调色板（局部优先，否则全局）
    pub palette: Vec<RGBA8>,
    pub transparent: Option<u8>,
    pub disposal: Disposal,
    /// 百分之一秒
    pub delay: u16,
}

impl RawFrame {
    /// 索引对应的颜色；透明索引或越界索引返回 `None`，绘制时保留下层像素
    pub fn color(&self, index: u8) -> Option<RGBA8> {
        if self.transparent == Some(index) {
            return None;
        }
        self.palette.get(index as usize).copied()
    }
}

/// 合成后的完整帧
#[derive(Clone, Debug, PartialEq)]
pub struct FullFrame {
    pub pixels: Vec<RGBA8>,
    pub width: usize,
    pub height: usize,
    /// 百分之一秒，始终 >= 1
    pub delay: u16,
}

impl FullFrame {
    pub fn pixel(&self, x: usize, y: usize) -> RGBA8 {
        self.pixels[y * self.width + x]
    }
}

/// 网格单元里的一帧
#[derive(Clone, Debug, PartialEq)]
pub struct CellFrame {
    pub pixels: Vec<RGBA8>,
    pub width: usize,
    pub height: usize,
    pub delay: u16,
}

/// 把声明的延时规整为可播放的值
pub fn normalize_delay(delay: u16) -> u16 {
    if delay == 0 {
        MIN_DELAY
    } else {
        delay
    }
}
