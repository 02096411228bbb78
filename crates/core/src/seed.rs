use crate::models::{Emotion, NewPolicy};

const POLICIES: &[(&str, &str)] = &[
    (
        "勤務時間",
        "従業員の勤務時間は午前9時から午後6時までです。休憩時間は1時間です。",
    ),
    (
        "休暇申請",
        "休暇の申請は、上司の承認を得て、2週間前に提出する必要があります。",
    ),
    (
        "day off",
        "You will need to submit a leave request and get approved by your manager at least 2 weeks prior to your requested leave date.",
    ),
    (
        "残業規定",
        "残業は原則として認められていませんが、緊急時には上司の許可を得ることで可能です。",
    ),
    (
        "服装規定",
        "従業員はビジネスカジュアルを着用することが求められます。ジーンズやスニーカーは許可されていません。",
    ),
    (
        "機密情報の取り扱い",
        "機密情報は厳重に管理され、許可のない第三者に漏洩することは禁止されています。",
    ),
    (
        "セキュリティポリシー",
        "パスワードは8文字以上で、大文字、小文字、数字を含む必要があります。定期的な変更が推奨されます。",
    ),
    (
        "出張規定",
        "出張の際は、上司の事前承認が必要で、出張報告書を提出する必要があります。",
    ),
    (
        "健康診断",
        "年に1回、従業員は健康診断を受ける義務があります。費用は会社が負担します。",
    ),
    (
        "ハラスメント防止",
        "すべての従業員は、ハラスメントを防止するためのガイドラインを遵守する必要があります。違反した場合は厳重に対処されます。",
    ),
    (
        "リモートワーク規定",
        "リモートワークは事前に上司の許可を得た場合にのみ許可されます。業務効率を保つためのルールを遵守する必要があります。",
    ),
];

const EMOTIONS: &[(i64, &str)] = &[
    (1, "Neutral"),
    (2, "Happy"),
    (3, "Angry"),
    (4, "Sad"),
    (5, "Confused"),
    (6, "Fun"),
    (7, "Surprised"),
    (8, "Sorry"),
];

pub fn default_policies() -> Vec<NewPolicy> {
    POLICIES
        .iter()
        .map(|(title, content)| NewPolicy {
            title: title.to_string(),
            content: content.to_string(),
        })
        .collect()
}

pub fn default_emotions() -> Vec<Emotion> {
    EMOTIONS
        .iter()
        .map(|(id, name)| Emotion {
            id: *id,
            name: name.to_string(),
        })
        .collect()
}
