// Mirrors the externally owned `subject_lines` table.

diesel::table! {
    subject_lines (id) {
        id -> Unsigned<BigInt>,
        subject_line -> Text,
        score -> Varchar,
        template -> Text,
        category -> Varchar,
    }
}
