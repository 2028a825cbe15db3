//! User-facing message templates (Arabic, HTML parse mode)
//!
//! Every error text states the fix, not just the failure — the only
//! deliberately vague message is the storage-failure notice, which must
//! not leak internals.

use indoc::{formatdoc, indoc};

use crate::core::config::{amount, price};
use crate::core::types::{PaymentMethod, Platform, RegistrationStage, TransferType};
use crate::core::validation::{NumberError, PaymentDetailsError, PhoneError};
use crate::pricing::PriceEntry;

// ==================== Shared ====================

pub fn generic_error() -> String {
    "❌ حدث خطأ مؤقت، حاول مرة أخرى بعد قليل.".to_string()
}

pub fn throttled() -> String {
    "⏳ طلبات كثيرة في وقت قصير! انتظر دقيقة ثم حاول مرة أخرى.".to_string()
}

pub fn busy_with_other_flow() -> String {
    "⚠️ عندك عملية جارية بالفعل.\n\nأكمِلها الأول أو اكتب /cancel لإلغائها.".to_string()
}

pub fn cancelled() -> String {
    "❌ تم الإلغاء.\n\n🏠 /start للقائمة الرئيسية".to_string()
}

pub fn help() -> String {
    indoc! {"
        📋 <b>الأوامر المتاحة:</b>
        🔹 /start - التسجيل والقائمة الرئيسية
        🔹 /sell - بيع الكوينز
        🔹 /profile - ملفك الشخصي
        🔹 /delete - مسح الملف الشخصي
        🔹 /cancel - إلغاء العملية الحالية
    "}
    .to_string()
}

// ==================== Registration ====================

pub fn choose_platform() -> String {
    "🎮 <b>أهلاً بيك!</b>\n\nاختر منصتك للبدء:".to_string()
}

pub fn platform_saved_enter_contact(platform: Platform) -> String {
    formatdoc! {"
        ✅ تم اختيار {platform}

        📱 <b>أدخل رقم الواتساب الخاص بك:</b>

        يجب أن يبدأ بـ 010/011/012/015 ويتكون من 11 رقماً
        <b>مثال:</b> <code>01012345678</code>
    ", platform = platform.label()}
}

pub fn contact_saved_choose_payment() -> String {
    "✅ تم حفظ رقم الواتساب\n\n💳 <b>اختر طريقة استلام الفلوس:</b>".to_string()
}

pub fn payment_instructions(method: PaymentMethod) -> String {
    let instruction = match method {
        PaymentMethod::VodafoneCash => "أدخل رقم فودافون كاش (11 رقماً يبدأ بـ 010) - أرقام فقط!",
        PaymentMethod::EtisalatCash => "أدخل رقم اتصالات كاش (11 رقماً يبدأ بـ 011) - أرقام فقط!",
        PaymentMethod::OrangeCash => "أدخل رقم أورانج كاش (11 رقماً يبدأ بـ 012) - أرقام فقط!",
        PaymentMethod::WeCash => "أدخل رقم وي كاش (11 رقماً يبدأ بـ 015) - أرقام فقط!",
        PaymentMethod::BankWallet => "أدخل رقم المحفظة البنكية (11 رقماً لأي شبكة مصرية) - أرقام فقط!",
        PaymentMethod::Telda => "أدخل رقم كارت تيلدا (16 رقماً بدون مسافات) - أرقام فقط!",
        PaymentMethod::Instapay => "أدخل رابط إنستاباي الكامل\n<b>مثال:</b> https://instapay.com.eg/abc123",
    };
    format!("✅ تم اختيار {}\n\n💳 {}", method.label(), instruction)
}

pub fn registration_complete(
    platform: Option<Platform>,
    whatsapp: &str,
    method: Option<PaymentMethod>,
    details: &str,
) -> String {
    formatdoc! {"
        🎉 <b>تم التسجيل بنجاح!</b>

        📋 <b>بياناتك:</b>
        • 🎮 المنصة: {platform}
        • 📱 الواتساب: <code>{whatsapp}</code>
        • 💳 طريقة الدفع: {method}
        • 🔢 بيانات الدفع: <code>{details}</code>

        💰 اكتب /sell لبيع الكوينز
    ",
        platform = platform.map(|p| p.label()).unwrap_or("غير محدد"),
        method = method.map(|m| m.label()).unwrap_or("غير محدد"),
    }
}

pub fn already_registered() -> String {
    indoc! {"
        ✅ <b>أنت مسجل بالفعل!</b>

        📋 <b>الأوامر المتاحة:</b>
        🔹 /profile - ملفك الشخصي
        🔹 /sell - بيع الكوينز
        🔹 /help - المساعدة
    "}
    .to_string()
}

pub fn nudge_choose_with_buttons() -> String {
    "⬆️ اختر من الأزرار بالأعلى 🙂".to_string()
}

pub fn interrupted_question(platform: Option<&str>, whatsapp: Option<&str>) -> String {
    formatdoc! {"
        🔄 <b>لاحظت أن تسجيلك لم يكتمل!</b>

        📋 <b>بياناتك:</b>
        • 🎮 المنصة: {platform}
        • 📱 الواتساب: {whatsapp}

        <b>❓ تحب تكمل ولا تبدأ من جديد؟</b>
    ",
        platform = platform.unwrap_or("غير محدد"),
        whatsapp = whatsapp.unwrap_or("لم يُدخل بعد"),
    }
}

pub fn resume_at_stage(stage: RegistrationStage) -> String {
    let hint = match stage {
        RegistrationStage::EnteringContact => "📱 أدخل رقم الواتساب الخاص بك:",
        RegistrationStage::ChoosingPayment => "💳 اختر طريقة استلام الفلوس:",
        RegistrationStage::EnteringPaymentDetails => "💳 أدخل بيانات الدفع:",
        _ => "🎮 اختر منصتك:",
    };
    format!("✅ <b>نكمل من حيث توقفنا!</b>\n\n{hint}")
}

pub fn restarting() -> String {
    "🔄 <b>نبدأ من جديد!</b>\n\n🎮 اختر منصتك:".to_string()
}

pub fn phone_error(err: &PhoneError) -> String {
    match err {
        PhoneError::NonDigit => "❌ يُسمح بالأرقام فقط! لا تستخدم حروف أو رموز.".to_string(),
        PhoneError::WrongLength(n) => {
            format!("❌ رقم غير صحيح ({n} رقماً). يجب أن يتكون من 11 رقماً بالضبط.")
        }
        PhoneError::BadPrefix => "❌ رقم غير صحيح. يجب أن يبدأ بـ 010/011/012/015 ويتكون من 11 رقماً.".to_string(),
    }
}

pub fn payment_details_error(err: &PaymentDetailsError) -> String {
    match err {
        PaymentDetailsError::NonDigit => "❌ يُسمح بالأرقام فقط! لا تستخدم حروف أو رموز.".to_string(),
        PaymentDetailsError::WrongLength(n) => {
            format!("❌ رقم غير صحيح ({n} رقماً). يجب أن يتكون من 11 رقماً بالضبط.")
        }
        PaymentDetailsError::BadPrefix => {
            "❌ رقم غير صحيح. يجب أن يبدأ بـ 010/011/012/015 ويتكون من 11 رقماً.".to_string()
        }
        PaymentDetailsError::BadCardLength(n) => {
            format!("❌ رقم كارت تيلدا غير صحيح ({n} رقماً). يجب أن يتكون من 16 رقماً بالضبط.")
        }
        PaymentDetailsError::NoInstapayUrl => {
            "❌ لم يتم العثور على رابط إنستاباي. يجب أن يحتوي على instapay.com.eg أو ipn.eg".to_string()
        }
    }
}

// ==================== Recovery ====================

pub fn greet_new_user() -> String {
    indoc! {"
        👋 <b>مرحباً!</b>

        يبدو أنك جديد هنا.

        🚀 اكتب /start لبدء التسجيل
        ❓ اكتب /help للمساعدة
    "}
    .to_string()
}

// ==================== Sale ====================

pub fn must_register_first() -> String {
    "❌ <b>يجب إكمال التسجيل أولاً!</b>\n\n🚀 /start للتسجيل".to_string()
}

pub fn sell_choose_platform() -> String {
    "💰 <b>بيع الكوينز</b>\n\n🎮 اختر منصتك:".to_string()
}

pub fn sell_platform_prices(platform: Platform, normal: Option<i64>, instant: Option<i64>) -> String {
    let fmt = |p: Option<i64>| p.map(format_egp).unwrap_or_else(|| "غير متاح".to_string());
    formatdoc! {"
        ✅ تم اختيار {platform}

        💰 <b>أسعار المليون كوين:</b>
        📅 عادي (خلال 24 ساعة): {normal}
        ⚡️ فوري (خلال ساعة): {instant}

        🎯 اختر نوع التحويل:
    ",
        platform = platform.label(),
        normal = fmt(normal),
        instant = fmt(instant),
    }
}

pub fn sell_enter_amount(platform: Platform, transfer_type: TransferType) -> String {
    formatdoc! {"
        ✅ <b>تم اختيار {platform} - {transfer}</b>

        💰 <b>أدخل كمية الكوينز للبيع:</b>

        📝 <b>قواعد الإدخال:</b>
        • أرقام فقط (بدون حروف أو رموز)
        • الحد الأدنى: {min} كوين
        • الحد الأقصى: {max} كوين

        ❌ للإلغاء: /cancel
    ",
        platform = platform.label(),
        transfer = transfer_type.label(),
        min = amount::MIN_COINS,
        max = format_thousands(amount::MAX_COINS),
    }
}

pub fn amount_error(err: &NumberError) -> String {
    match err {
        NumberError::NotDigits => indoc! {"
            ❌ <b>صيغة غير صحيحة!</b>

            ✅ <b>المطلوب:</b> أرقام فقط
            🚫 <b>ممنوع:</b> حروف، رموز، k، m
        "}
        .to_string(),
        NumberError::TooLow { value, min } => {
            format!("❌ <b>الكمية قليلة جداً!</b>\n\n📍 الحد الأدنى: {min} كوين\nأنت أدخلت: {value} كوين")
        }
        NumberError::TooHigh { value, max } => format!(
            "❌ <b>الكمية كبيرة جداً!</b>\n\n📍 الحد الأقصى: {} كوين\nأنت أدخلت: {} كوين",
            format_thousands(*max),
            format_thousands(*value)
        ),
    }
}

pub fn sell_order_confirmed(
    order_id: &str,
    platform: Platform,
    transfer_type: TransferType,
    coins: i64,
    total: i64,
    per_million: i64,
) -> String {
    formatdoc! {"
        🎉 <b>تم تأكيد طلب البيع بنجاح!</b>

        📊 <b>تفاصيل الطلب:</b>
        🎮 المنصة: {platform}
        💰 الكمية: {coins} كوين
        💵 السعر: {total}
        ⭐ (سعر المليون: {per_million})
        ⏰ نوع التحويل: {transfer}
        🆔 رقم الطلب: <code>{order_id}</code>

        📞 سيتم التواصل معك خلال دقائق.
    ",
        platform = platform.label(),
        transfer = transfer_type.label(),
        coins = format_thousands(coins),
        total = format_egp(total),
        per_million = format_egp(per_million),
    }
}

pub fn sell_price_unavailable() -> String {
    "❌ السعر غير متاح حالياً لهذه المنصة. حاول لاحقاً أو تواصل مع الدعم.".to_string()
}

// ==================== Admin ====================

pub fn not_admin() -> String {
    "⛔ هذا الأمر متاح للإدارة فقط.".to_string()
}

pub fn admin_main_menu() -> String {
    "⚙️ <b>لوحة الإدارة</b>\n\nاختر من القائمة:".to_string()
}

pub fn admin_all_prices(entries: &[PriceEntry]) -> String {
    let mut out = String::from("💰 <b>الأسعار الحالية (لكل مليون كوين):</b>\n\n");
    for entry in entries {
        out.push_str(&format!(
            "{} — {}: {}\n",
            entry.platform.label(),
            entry.transfer_type.label(),
            format_egp(entry.price)
        ));
    }
    out
}

pub fn admin_choose_platform() -> String {
    "🎮 اختر المنصة لتعديل سعرها:".to_string()
}

pub fn admin_choose_transfer(platform: Platform) -> String {
    format!("✅ {}\n\n⏰ اختر نوع التحويل:", platform.label())
}

pub fn admin_enter_price(platform: Platform, transfer_type: TransferType, current: Option<i64>) -> String {
    formatdoc! {"
        ✅ {platform} - {transfer}

        💵 السعر الحالي: {current}

        💰 <b>أدخل السعر الجديد (لكل مليون كوين):</b>
        الحد الأدنى: {min} - الحد الأقصى: {max}
    ",
        platform = platform.label(),
        transfer = transfer_type.label(),
        current = current.map(format_egp).unwrap_or_else(|| "غير محدد".to_string()),
        min = format_thousands(price::MIN_PRICE),
        max = format_thousands(price::MAX_PRICE),
    }
}

pub fn price_error(err: &NumberError) -> String {
    match err {
        NumberError::NotDigits => "❌ يرجى إدخال أرقام فقط.".to_string(),
        NumberError::TooLow { min, .. } => {
            format!("❌ السعر قليل جداً! الحد الأدنى: {}", format_egp(*min))
        }
        NumberError::TooHigh { max, .. } => {
            format!("❌ السعر عالي جداً! الحد الأقصى: {}", format_egp(*max))
        }
    }
}

pub fn price_updated(platform: Platform, transfer_type: TransferType, old: Option<i64>, new: i64) -> String {
    formatdoc! {"
        ✅ <b>تم تحديث السعر!</b>

        {platform} - {transfer}
        القديم: {old}
        الجديد: {new}
    ",
        platform = platform.label(),
        transfer = transfer_type.label(),
        old = old.map(format_egp).unwrap_or_else(|| "غير محدد".to_string()),
        new = format_egp(new),
    }
}

pub fn admin_closed() -> String {
    "✅ تم إغلاق لوحة الإدارة.".to_string()
}

// ==================== Profile ====================

pub fn profile_summary(
    platform: Option<Platform>,
    whatsapp: Option<&str>,
    method: Option<PaymentMethod>,
    details: Option<&str>,
) -> String {
    formatdoc! {"
        👤 <b>ملفك الشخصي:</b>

        • 🎮 المنصة: {platform}
        • 📱 الواتساب: <code>{whatsapp}</code>
        • 💳 طريقة الدفع: {method}
        • 🔢 بيانات الدفع: <code>{details}</code>

        🗑️ /delete لمسح الملف نهائياً
    ",
        platform = platform.map(|p| p.label()).unwrap_or("غير محدد"),
        whatsapp = whatsapp.unwrap_or("لم يُدخل بعد"),
        method = method.map(|m| m.label()).unwrap_or("غير محدد"),
        details = details.unwrap_or("لم تُدخل بعد"),
    }
}

pub fn no_profile() -> String {
    "❌ لا يوجد ملف شخصي بعد.\n\n🚀 اكتب /start للتسجيل".to_string()
}

pub fn delete_confirmation() -> String {
    indoc! {"
        ⚠️ <b>تحذير هام!</b>

        سيتم مسح ملفك الشخصي وكل طلباتك نهائياً.
        لا يمكن التراجع عن هذه الخطوة.

        <b>❓ متأكد؟</b>
    "}
    .to_string()
}

pub fn profile_deleted() -> String {
    "🗑️ تم مسح ملفك الشخصي نهائياً.\n\n🚀 /start للتسجيل من جديد".to_string()
}

pub fn delete_cancelled() -> String {
    "✅ تم الاحتفاظ بملفك الشخصي.".to_string()
}

// ==================== Formatting helpers ====================

pub fn format_thousands(value: i64) -> String {
    let digits = value.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn format_egp(value: i64) -> String {
    format!("{} ج.م", format_thousands(value))
}
