use crate::models::notification::Verb;
use slug::slugify;

/// 从问题标题生成 URL 友好的 slug
pub fn generate_slug(title: &str) -> String {
    let mut slug = slugify(title);

    // 限制长度，尽量在连字符处截断
    if slug.len() > 100 {
        slug.truncate(100);
        if let Some(last_hyphen) = slug.rfind('-') {
            if last_hyphen > 50 {
                slug.truncate(last_hyphen);
            }
        }
        slug = slug.trim_matches('-').to_string();
    }

    if slug.is_empty() {
        slug = "untitled".to_string();
    }

    slug
}

/// 若 slug 已被占用则追加数字后缀
pub fn make_slug_unique(base_slug: &str, exists: impl Fn(&str) -> bool) -> String {
    let mut slug = base_slug.to_string();
    let mut counter = 1;

    while exists(&slug) {
        slug = format!("{}-{}", base_slug, counter);
        counter += 1;

        if counter > 1000 {
            slug = format!("{}-{}", base_slug, uuid::Uuid::new_v4());
            break;
        }
    }

    slug
}

/// 通知的 slug：`<接收者用户名> <通知 ID> <动词代码>` 规范化后的结果
pub fn notification_slug(recipient_username: &str, notification_id: &str, verb: Verb) -> String {
    slugify(format!("{} {} {}", recipient_username, notification_id, verb.code()))
}
