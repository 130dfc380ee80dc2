/// Parses an hour written either with ASCII digits or as a Chinese numeral
/// (`两`, `十一`, `二十三`, ...). Returns `None` for anything else.
pub fn parse_hour(raw: &str) -> Option<u32> {
    if raw.chars().all(|ch| ch.is_ascii_digit()) {
        return raw.parse().ok();
    }
    parse_chinese_number(raw)
}

fn chinese_digit(ch: char) -> Option<u32> {
    let value = match ch {
        '零' | '〇' => 0,
        '一' => 1,
        '二' | '两' => 2,
        '三' => 3,
        '四' => 4,
        '五' => 5,
        '六' => 6,
        '七' => 7,
        '八' => 8,
        '九' => 9,
        _ => return None,
    };
    Some(value)
}

/// Handles numbers below one hundred: `五`, `十`, `十二`, `二十`, `二十三`.
fn parse_chinese_number(raw: &str) -> Option<u32> {
    let chars: Vec<char> = raw.chars().collect();
    match chars.iter().position(|&ch| ch == '十') {
        None if chars.len() == 1 => chinese_digit(chars[0]),
        None => None,
        Some(index) => {
            let tens = match &chars[..index] {
                [] => 1,
                [digit] => chinese_digit(*digit).filter(|&value| value > 0)?,
                _ => return None,
            };
            let units = match &chars[index + 1..] {
                [] => 0,
                [digit] => chinese_digit(*digit)?,
                _ => return None,
            };
            Some(tens * 10 + units)
        }
    }
}
