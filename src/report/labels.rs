use chrono::NaiveDate;

use crate::config::Locale;
use crate::date_util::{format_iso, ru_days};
use crate::store::CohortStatus;

/// User-facing strings for one locale.
#[derive(Debug, Clone, Copy)]
pub struct Labels {
    pub locale: Locale,
    pub no_data: &'static str,

    pub summary_header: &'static str,
    pub totals_header: &'static str,
    pub unique_users: &'static str,
    pub paid_share: &'static str,
    pub organic_share: &'static str,
    pub likes_median_header: &'static str,
    pub views_median_header: &'static str,
    pub messages_median_header: &'static str,
    pub paid_traffic: &'static str,
    pub organic_traffic: &'static str,

    pub trends_caption: &'static str,
    pub trends_title: &'static str,
    pub audience_caption: &'static str,
    pub audience_title: &'static str,
    pub dau_both_platforms: &'static str,
    pub feed_likes: &'static str,
    pub feed_views: &'static str,
    pub messages_sent_title: &'static str,
    pub senders_title: &'static str,

    pub feed_header: &'static str,
    pub feed_caption: &'static str,
    pub feed_title: &'static str,
    pub messaging_header: &'static str,
    pub messaging_caption: &'static str,
    pub messaging_title: &'static str,

    pub dau_title: &'static str,
    pub likes_title: &'static str,
    pub views_title: &'static str,
    pub ctr_title: &'static str,
    pub messages_title: &'static str,
    pub mean_title: &'static str,
    pub median_title: &'static str,

    pub views_line: &'static str,
    pub likes_line: &'static str,
    pub messages_line: &'static str,
    pub median_line: &'static str,
    pub mean_line: &'static str,

    pub axis_date: &'static str,
    pub axis_week: &'static str,
    pub axis_users: &'static str,
    pub axis_likes: &'static str,
    pub axis_views: &'static str,
    pub axis_messages: &'static str,
}

pub const RU: Labels = Labels {
    locale: Locale::Ru,
    no_data: "Нет данных для отчёта.",

    summary_header: "Отчет на",
    totals_header: "Общие метрики (за весь период):",
    unique_users: "- Количество уникальных пользователей:",
    paid_share: "- Доля рекламных пользователей:",
    organic_share: "- Доля органических пользователей:",
    likes_median_header: "Лайки на пользователя (медиана):",
    views_median_header: "Просмотры на пользователя (медиана):",
    messages_median_header: "Сообщения на пользователя (медиана):",
    paid_traffic: "- Платный трафик:",
    organic_traffic: "- Органический трафик:",

    trends_caption: "📊 Графики метрик",
    trends_title: "Графики метрик",
    audience_caption: "📊 График активная аудитория по неделям",
    audience_title: "Динамика пользователей по статусам (ушедшие, старые, новые)",
    dau_both_platforms: "Количество уникальных пользователей на обеих платформах",
    feed_likes: "Количество лайков в ленте новостей",
    feed_views: "Количество просмотров в ленте новостей",
    messages_sent_title: "Количество отправленных сообщений в мессенджере",
    senders_title: "Количество пользователей отправивших сообщения в мессенджере",

    feed_header: "Метрики ленты новостей за",
    feed_caption: "📊 Графики метрик в ленте новостей",
    feed_title: "Графики метрик в ленте новостей за предыдущую неделю",
    messaging_header: "Метрики в мессенджере за",
    messaging_caption: "📊 Графики по метрикам в мессенджере",
    messaging_title: "Графики метрик в мессенджере за предыдущую неделю",

    dau_title: "Количество уникальных пользователей",
    likes_title: "Количество лайков",
    views_title: "Количество просмотров",
    ctr_title: "CTR",
    messages_title: "Количество отправленных сообщений",
    mean_title: "Среднее на одного пользователя",
    median_title: "Медиана на одного пользователя",

    views_line: "- Количество просмотров:",
    likes_line: "- Количество лайков:",
    messages_line: "- Количество отправленных сообщений:",
    median_line: "- Медиана:",
    mean_line: "- Среднее:",

    axis_date: "Дата",
    axis_week: "Неделя",
    axis_users: "Количество пользователей",
    axis_likes: "Количество лайков",
    axis_views: "Количество просмотров",
    axis_messages: "Количество отправленных сообщений",
};

pub const EN: Labels = Labels {
    locale: Locale::En,
    no_data: "No data for the report.",

    summary_header: "Report for",
    totals_header: "Overall metrics (all time):",
    unique_users: "- Unique users:",
    paid_share: "- Paid users share:",
    organic_share: "- Organic users share:",
    likes_median_header: "Likes per user (median):",
    views_median_header: "Views per user (median):",
    messages_median_header: "Messages per user (median):",
    paid_traffic: "- Paid traffic:",
    organic_traffic: "- Organic traffic:",

    trends_caption: "📊 Metric charts",
    trends_title: "Metric charts",
    audience_caption: "📊 Active audience by week",
    audience_title: "Users by status (departed, old, new)",
    dau_both_platforms: "Unique users across both platforms",
    feed_likes: "Likes in the news feed",
    feed_views: "Views in the news feed",
    messages_sent_title: "Messages sent in the messenger",
    senders_title: "Users who sent messages",

    feed_header: "News feed metrics for",
    feed_caption: "📊 News feed charts",
    feed_title: "News feed metrics for the previous week",
    messaging_header: "Messenger metrics for",
    messaging_caption: "📊 Messenger charts",
    messaging_title: "Messenger metrics for the previous week",

    dau_title: "Unique users",
    likes_title: "Likes",
    views_title: "Views",
    ctr_title: "CTR",
    messages_title: "Messages sent",
    mean_title: "Mean per user",
    median_title: "Median per user",

    views_line: "- Views:",
    likes_line: "- Likes:",
    messages_line: "- Messages sent:",
    median_line: "- Median:",
    mean_line: "- Mean:",

    axis_date: "Date",
    axis_week: "Week",
    axis_users: "Users",
    axis_likes: "Likes",
    axis_views: "Views",
    axis_messages: "Messages",
};

impl Labels {
    pub fn for_locale(locale: Locale) -> &'static Labels {
        match locale {
            Locale::Ru => &RU,
            Locale::En => &EN,
        }
    }

    /// Line explaining what the parenthesised deltas compare against.
    pub fn comparison_note(&self, baseline_days: usize) -> String {
        let n = baseline_days as u32;
        match self.locale {
            Locale::Ru => format!(
                "(в скобках — изменение вчерашних значений по сравнению со средним значением за предыдущие {n} {}):",
                ru_days(n)
            ),
            Locale::En => format!(
                "(in brackets: yesterday's change against the mean of the previous {n} day{}):",
                if n == 1 { "" } else { "s" }
            ),
        }
    }

    /// `с 2025-07-10 по 2025-07-17`
    pub fn date_range(&self, first: NaiveDate, last: NaiveDate) -> String {
        let (first, last) = (format_iso(first), format_iso(last));
        match self.locale {
            Locale::Ru => format!("с {first} по {last}"),
            Locale::En => format!("from {first} to {last}"),
        }
    }

    pub fn cohort_status(&self, status: CohortStatus) -> &'static str {
        match (self.locale, status) {
            (Locale::Ru, CohortStatus::Departed) => "ушедшие",
            (Locale::Ru, CohortStatus::Old) => "старые",
            (Locale::Ru, CohortStatus::New) => "новые",
            (Locale::En, status) => status.as_str(),
        }
    }
}
