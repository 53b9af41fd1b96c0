//! 输入行 → 入站帧
//!
//! 每行一条指令，支持三种写法：
//! - 操作码字符加可选参数：`3`、`9 40`、`X`
//! - 别名：`forward`、`speed 40`、`avoid ccw` 等
//! - 空行和 `#` 开头的注释行被跳过
//!
//! 这里只负责拼出帧字节（byte 0 为路由标记），参数合法性由调度器的解码器判断。

use anyhow::{Result, bail};
use m3pi_sdk::protocol::{Command, Opcode, ROUTE_TAG, Rotation};

/// 把一行输入转换为入站帧字节
///
/// 空行、注释返回 `Ok(None)`。
pub fn parse_line(line: &str) -> Result<Option<Vec<u8>>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    if let Some(frame) = alias_frame(&word.to_ascii_lowercase(), rest)? {
        return Ok(Some(frame));
    }

    // 操作码字符：第一个字符是选择字节，其余原样作为参数
    let mut chars = line.chars();
    let Some(selector) = chars.next() else {
        return Ok(None);
    };
    if !selector.is_ascii() {
        bail!("opcode must be a single ASCII character, got {selector:?}");
    }

    let mut frame = vec![ROUTE_TAG, selector as u8];
    frame.extend_from_slice(chars.as_str().as_bytes());
    Ok(Some(frame))
}

fn alias_frame(word: &str, rest: &str) -> Result<Option<Vec<u8>>> {
    let command = match word {
        "ping" | "hi" => Command::PublishLiveness,
        "led" => Command::IndicatorOn,
        "blink" => Command::IndicatorBlink,
        "forward" | "fwd" => Command::MoveForward,
        "backward" | "back" => Command::MoveBackward,
        "cw" => Command::RotateCw,
        "ccw" => Command::RotateCcw,
        "avoid" => match rest.to_ascii_lowercase().as_str() {
            "cw" => Command::SetAvoidance(Rotation::Cw),
            "ccw" => Command::SetAvoidance(Rotation::Ccw),
            other => bail!("avoid expects `cw` or `ccw`, got {other:?}"),
        },
        "speed" => {
            // 数值交给解码器校验，越界的速度在入队时被拒绝
            let mut frame = vec![ROUTE_TAG, u8::from(Opcode::SetSpeed)];
            frame.extend_from_slice(rest.as_bytes());
            return Ok(Some(frame));
        },
        _ => return Ok(None),
    };

    Ok(Some(command.to_frame().data_slice().to_vec()))
}
